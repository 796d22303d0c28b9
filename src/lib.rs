//! PPE Guard
//!
//! Per-person personal protective equipment compliance for single video
//! frames, plus the socket protocol between a capture process and an
//! inference process.
//!
//! # Pipeline
//!
//! capture source → JPEG → framed request → server worker → detector →
//! compliance engine → JSON report → framed response → annotate → snapshot
//! (only when the frame has a violation).
//!
//! # Module Structure
//!
//! - `geometry`: bounding boxes, strict center containment, IoU
//! - `detect`: detections, the class taxonomy, detector backends
//! - `compliance`: classifier, association, category resolver, frame report
//! - `wire`: length-prefixed framing and the JSON report codec
//! - `server` / `client`: the inference endpoint and its caller
//! - `capture`, `annotate`, `snapshot`: the capture side
//! - `config`: JSON file plus environment configuration for both binaries

pub mod annotate;
pub mod capture;
pub mod client;
pub mod compliance;
pub mod config;
pub mod detect;
pub mod geometry;
pub mod image_io;
pub mod server;
pub mod snapshot;
pub mod wire;

pub use client::InferenceClient;
pub use compliance::{
    frame_is_fully_compliant, has_violation, AssociationPolicy, CategoryVerdict,
    ComplianceEngine, ComplianceRecord, Evidence, FrameComplianceReport, VerdictStatus,
};
pub use detect::{BackendRegistry, Detection, DetectorBackend, PpeCategory, PpeClass, StubBackend};
pub use geometry::BoundingBox;
pub use server::{InferenceServer, ServerHandle, ServerOptions};
