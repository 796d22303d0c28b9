use anyhow::Result;

use crate::detect::result::Detection;

/// Object detector backend.
///
/// Backends may hold non-reentrant inference state, so `detect` takes
/// `&mut self`; callers share a backend through `BackendRegistry`, which
/// serializes access behind a `Mutex`.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a packed RGB8 frame.
    ///
    /// Returned boxes are in source-frame pixel coordinates, in the order the
    /// detector produced them.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
