//! Frame sources for the capture client.
//!
//! - `stub://<name>`: synthetic 640x480 frames for tests and demos
//! - a local directory: every `.jpg`/`.jpeg` file in name order, looping

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};

const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;

pub struct CaptureSource {
    backend: SourceBackend,
    frames_captured: u64,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    Directory(DirectorySource),
}

impl CaptureSource {
    pub fn open(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(anyhow!("capture source must not be empty"));
        }
        let backend = if let Some(name) = location.strip_prefix("stub://") {
            SourceBackend::Synthetic(SyntheticSource::new(name))
        } else if location.contains("://") {
            return Err(anyhow!(
                "unsupported capture source '{}' (expected stub:// or a local directory)",
                location
            ));
        } else {
            SourceBackend::Directory(DirectorySource::open(Path::new(location))?)
        };
        log::info!("capture source: {}", location);
        Ok(Self {
            backend,
            frames_captured: 0,
        })
    }

    pub fn next_frame(&mut self) -> Result<RgbImage> {
        let frame = match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            SourceBackend::Directory(source) => source.next_frame()?,
        };
        self.frames_captured += 1;
        Ok(frame)
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }
}

struct SyntheticSource {
    seed: u8,
    frame_count: u64,
}

impl SyntheticSource {
    fn new(name: &str) -> Self {
        let seed = name.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
        Self {
            seed,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> RgbImage {
        self.frame_count += 1;
        let shift = (self.frame_count % 256) as u8;
        let seed = self.seed;
        RgbImage::from_fn(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, |x, y| {
            Rgb([
                (x % 256) as u8 ^ seed,
                (y % 256) as u8,
                shift.wrapping_add(((x + y) % 256) as u8),
            ])
        })
    }
}

struct DirectorySource {
    files: Vec<PathBuf>,
    cursor: usize,
}

impl DirectorySource {
    fn open(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read capture directory {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_jpeg = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
                .unwrap_or(false);
            if is_jpeg && path.is_file() {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no JPEG files in {}", dir.display()));
        }
        files.sort();
        Ok(Self { files, cursor: 0 })
    }

    fn next_frame(&mut self) -> Result<RgbImage> {
        let path = &self.files[self.cursor];
        self.cursor = (self.cursor + 1) % self.files.len();
        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        Ok(image.into_rgb8())
    }
}
