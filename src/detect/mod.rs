mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{Detection, PpeCategory, PpeClass, MAX_CLASS_ID, PERSON_CLASS_ID};
