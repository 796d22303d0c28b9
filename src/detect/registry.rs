use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::config::{DetectorKind, DetectorSettings};
use crate::detect::result::Detection;

use super::backend::DetectorBackend;
use super::backends::StubBackend;

/// Shared handle to one detector instance.
pub type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

/// Thread-safe registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
/// Every worker that runs detection goes through the same lock, so one backend
/// instance never sees concurrent calls.
pub struct BackendRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name
            .as_ref()
            .and_then(|name| self.backends.get(name).cloned())
    }

    /// Name of the default backend.
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Run detection on the default backend, holding its lock for the call.
    pub fn detect(&self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let backend = self
            .default_backend()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("detector backend lock poisoned"))?;
        guard.detect(pixels, width, height)
    }

    /// Registry holding the one backend described by `settings`.
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        let mut registry = Self::new();
        match settings.backend {
            DetectorKind::Stub => {
                let backend = match &settings.stub_detections {
                    Some(path) => StubBackend::from_json_file(path)?,
                    None => StubBackend::new(),
                };
                registry.register(backend);
            }
            #[cfg(feature = "backend-tract")]
            DetectorKind::Tract => {
                let path = settings
                    .model_path
                    .as_ref()
                    .ok_or_else(|| anyhow!("tract detector requires model_path"))?;
                let backend = super::backends::TractBackend::new(path, settings.input_size)?
                    .with_threshold(settings.confidence_threshold)
                    .with_iou_threshold(settings.iou_threshold);
                registry.register(backend);
            }
            #[cfg(not(feature = "backend-tract"))]
            DetectorKind::Tract => {
                return Err(anyhow!(
                    "tract detector requires the backend-tract feature"
                ));
            }
        }
        Ok(registry)
    }

    /// Warm up every registered backend.
    pub fn warm_up(&self) -> Result<()> {
        for (name, backend) in &self.backends {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend '{}' lock poisoned", name))?;
            guard.warm_up()?;
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
