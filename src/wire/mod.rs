//! Capture ↔ inference wire contract.
//!
//! Every request and response is one length-prefixed frame. Requests carry a
//! JPEG image, responses carry the JSON compliance report.

mod codec;
mod framing;

pub use codec::{decode_report, encode_report};
pub use framing::{read_frame, write_frame, DEFAULT_MAX_FRAME_BYTES};

/// Default inference endpoint.
pub const DEFAULT_ADDR: &str = "127.0.0.1:13750";
