//! Violation snapshots on disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

use crate::image_io::{encode_jpeg, JPEG_QUALITY};

pub const DEFAULT_SNAPSHOT_DIR: &str = "violations";

/// Writes annotated frames as `<unix-seconds>.<micros>.jpg`.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn save(&self, image: &RgbImage) -> Result<PathBuf> {
        self.save_at(image, SystemTime::now())
    }

    /// Save with an explicit capture time. Never overwrites: a name already
    /// taken gets a numeric suffix.
    pub fn save_at(&self, image: &RgbImage, at: SystemTime) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create snapshot dir {}", self.dir.display()))?;
        let bytes = encode_jpeg(image, JPEG_QUALITY)?;
        let stem = snapshot_stem(at)?;

        for attempt in 0u32..100 {
            let name = if attempt == 0 {
                format!("{stem}.jpg")
            } else {
                format!("{stem}-{attempt}.jpg")
            };
            let path = self.dir.join(name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to create snapshot {}", path.display()))
                }
            };
            file.write_all(&bytes)
                .with_context(|| format!("failed to write snapshot {}", path.display()))?;
            return Ok(path);
        }
        Err(anyhow!("no free snapshot name for {} in {}", stem, self.dir.display()))
    }
}

fn snapshot_stem(at: SystemTime) -> Result<String> {
    let since = at
        .duration_since(UNIX_EPOCH)
        .map_err(|_| anyhow!("snapshot time before unix epoch"))?;
    Ok(format!("{}.{:06}", since.as_secs(), since.subsec_micros()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn names_snapshots_by_capture_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("violations"));
        let image = RgbImage::new(8, 8);
        let at = UNIX_EPOCH + Duration::from_micros(1_700_000_000_000_042);

        let first = store.save_at(&image, at).unwrap();
        assert_eq!(first.file_name().unwrap(), "1700000000.000042.jpg");
        assert!(first.exists());

        let second = store.save_at(&image, at).unwrap();
        assert_eq!(second.file_name().unwrap(), "1700000000.000042-1.jpg");
    }
}
