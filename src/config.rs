use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compliance::AssociationPolicy;
use crate::snapshot::DEFAULT_SNAPSHOT_DIR;
use crate::wire::{DEFAULT_ADDR, DEFAULT_MAX_FRAME_BYTES};

const DEFAULT_WORKERS: usize = 2;
const DEFAULT_QUEUE_DEPTH: usize = 8;
const DEFAULT_IO_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_CAPTURE_SOURCE: &str = "stub://camera";
const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Shared JSON config file. Both binaries read the same file and pick their
/// own section.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    server: Option<ServerConfigFile>,
    capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    addr: Option<String>,
    workers: Option<usize>,
    queue_depth: Option<usize>,
    max_frame_bytes: Option<usize>,
    io_timeout_ms: Option<u64>,
    association: Option<AssociationPolicy>,
    overlap_diagnostics: Option<bool>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    stub_detections: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    server_addr: Option<String>,
    source: Option<String>,
    capture_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    snapshot_dir: Option<PathBuf>,
    max_frame_bytes: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorKind {
    /// Scripted detections, for tests and demos.
    Stub,
    /// ONNX model through tract (feature `backend-tract`).
    Tract,
}

impl DetectorKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(DetectorKind::Stub),
            "tract" => Ok(DetectorKind::Tract),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected stub or tract)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: DetectorKind,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub stub_detections: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub workers: usize,
    pub queue_depth: usize,
    pub max_frame_bytes: usize,
    pub io_timeout: Duration,
    pub association: AssociationPolicy,
    pub overlap_diagnostics: bool,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub server_addr: String,
    pub source: String,
    pub capture_interval: Duration,
    pub request_timeout: Duration,
    pub snapshot_dir: PathBuf,
    pub max_frame_bytes: usize,
}

/// Config file path from `PPE_CONFIG`, if set.
fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("PPE_CONFIG")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

fn load_file(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(path) => read_config_file(path),
        None => Ok(ConfigFile::default()),
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(config_path_from_env().as_deref())
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = load_file(path)?;
        let mut cfg = Self::from_file(file.server.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ServerConfigFile) -> Result<Self> {
        let detector_file = file.detector.unwrap_or_default();
        let backend = match detector_file.backend.as_deref() {
            Some(name) => DetectorKind::parse(name)?,
            None => DetectorKind::Stub,
        };
        let detector = DetectorSettings {
            backend,
            model_path: detector_file.model_path,
            input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            iou_threshold: detector_file.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
            stub_detections: detector_file.stub_detections,
        };
        Ok(Self {
            addr: file.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            workers: file.workers.unwrap_or(DEFAULT_WORKERS),
            queue_depth: file.queue_depth.unwrap_or(DEFAULT_QUEUE_DEPTH),
            max_frame_bytes: file.max_frame_bytes.unwrap_or(DEFAULT_MAX_FRAME_BYTES),
            io_timeout: Duration::from_millis(
                file.io_timeout_ms.unwrap_or(DEFAULT_IO_TIMEOUT_MS),
            ),
            association: file.association.unwrap_or_default(),
            overlap_diagnostics: file.overlap_diagnostics.unwrap_or(false),
            detector,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("PPE_SERVER_ADDR") {
            if !addr.trim().is_empty() {
                self.addr = addr;
            }
        }
        if let Ok(workers) = std::env::var("PPE_WORKERS") {
            self.workers = workers
                .trim()
                .parse()
                .map_err(|_| anyhow!("PPE_WORKERS must be a positive integer"))?;
        }
        if let Ok(depth) = std::env::var("PPE_QUEUE_DEPTH") {
            self.queue_depth = depth
                .trim()
                .parse()
                .map_err(|_| anyhow!("PPE_QUEUE_DEPTH must be a positive integer"))?;
        }
        if let Ok(policy) = std::env::var("PPE_ASSOCIATION") {
            if !policy.trim().is_empty() {
                self.association = policy.parse()?;
            }
        }
        if let Ok(backend) = std::env::var("PPE_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = DetectorKind::parse(&backend)?;
            }
        }
        if let Ok(path) = std::env::var("PPE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow!("workers must be at least 1"));
        }
        if self.queue_depth == 0 {
            return Err(anyhow!("queue_depth must be at least 1"));
        }
        if self.max_frame_bytes == 0 {
            return Err(anyhow!("max_frame_bytes must be greater than zero"));
        }
        if self.io_timeout.is_zero() {
            return Err(anyhow!("io_timeout must be greater than zero"));
        }
        validate_threshold("confidence_threshold", self.detector.confidence_threshold)?;
        validate_threshold("iou_threshold", self.detector.iou_threshold)?;
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if self.detector.backend == DetectorKind::Tract && self.detector.model_path.is_none() {
            return Err(anyhow!("tract detector requires model_path"));
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(config_path_from_env().as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = load_file(path)?;
        let mut cfg = Self::from_file(file.capture.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        Self {
            server_addr: file.server_addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            source: file
                .source
                .unwrap_or_else(|| DEFAULT_CAPTURE_SOURCE.to_string()),
            capture_interval: Duration::from_millis(
                file.capture_interval_ms
                    .unwrap_or(DEFAULT_CAPTURE_INTERVAL_MS),
            ),
            request_timeout: Duration::from_millis(
                file.request_timeout_ms
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
            snapshot_dir: file
                .snapshot_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR)),
            max_frame_bytes: file.max_frame_bytes.unwrap_or(DEFAULT_MAX_FRAME_BYTES),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("PPE_SERVER_ADDR") {
            if !addr.trim().is_empty() {
                self.server_addr = addr;
            }
        }
        if let Ok(source) = std::env::var("PPE_CAPTURE_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(interval) = std::env::var("PPE_CAPTURE_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                anyhow!("PPE_CAPTURE_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.capture_interval = Duration::from_millis(millis);
        }
        if let Ok(dir) = std::env::var("PPE_SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                self.snapshot_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("capture source must not be empty"));
        }
        if self.capture_interval.is_zero() {
            return Err(anyhow!("capture interval must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("request timeout must be greater than zero"));
        }
        if self.max_frame_bytes == 0 {
            return Err(anyhow!("max_frame_bytes must be greater than zero"));
        }
        Ok(())
    }
}

fn validate_threshold(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
