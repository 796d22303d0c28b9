use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Stub backend for testing. Returns the same scripted detections for every frame.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    detections: Vec<Detection>,
}

impl StubBackend {
    /// Backend that never detects anything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Load scripted detections from a JSON array of `Detection`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stub detections {}", path.display()))?;
        let detections: Vec<Detection> = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid stub detections {}: {}", path.display(), e))?;
        Ok(Self::with_detections(detections))
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected,
                pixels.len()
            ));
        }
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use std::io::Write;

    #[test]
    fn stub_backend_replays_script() {
        let helmet = Detection::new(1, 0.8, BoundingBox::from_corners(1.0, 1.0, 3.0, 3.0));
        let mut backend = StubBackend::with_detections(vec![helmet]);

        assert_eq!(backend.detect(&[0u8; 27], 3, 3).unwrap(), vec![helmet]);
        assert_eq!(backend.detect(&[0u8; 27], 3, 3).unwrap(), vec![helmet]);
        assert!(backend.detect(&[0u8; 5], 3, 3).is_err());
    }

    #[test]
    fn stub_backend_loads_json_script() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[
                {"class_id": 0, "confidence": 0.95, "bbox": {"x1": 0, "y1": 0, "x2": 100, "y2": 200}},
                {"class_id": 2, "confidence": 0.6, "bbox": {"x1": 40, "y1": 5, "x2": 60, "y2": 25}}
            ]"#,
        )
        .unwrap();

        let mut backend = StubBackend::from_json_file(file.path()).unwrap();
        let found = backend.detect(&[], 0, 0).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].class_id, 2);
        assert_eq!(found[1].bbox.x2, 60.0);
    }
}
