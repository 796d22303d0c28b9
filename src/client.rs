//! Client side of the inference protocol.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::compliance::FrameComplianceReport;
use crate::wire::{decode_report, read_frame, write_frame, DEFAULT_ADDR, DEFAULT_MAX_FRAME_BYTES};

#[derive(Clone, Debug)]
pub struct InferenceClient {
    addr: String,
    timeout: Duration,
    max_frame_bytes: usize,
}

impl Default for InferenceClient {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR, Duration::from_secs(10))
    }
}

impl InferenceClient {
    /// `timeout` bounds connecting and each read or write of the round trip.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    fn resolve(&self) -> Result<SocketAddr> {
        self.addr
            .to_socket_addrs()
            .with_context(|| format!("invalid server address {}", self.addr))?
            .next()
            .ok_or_else(|| anyhow!("server address {} resolved to nothing", self.addr))
    }

    /// Send one JPEG frame and wait for its report.
    pub fn request(&self, jpeg: &[u8]) -> Result<FrameComplianceReport> {
        let addr = self.resolve()?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .with_context(|| format!("failed to connect to {}", addr))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        write_frame(&mut stream, jpeg).context("failed to send frame")?;
        let payload =
            read_frame(&mut stream, self.max_frame_bytes).context("failed to receive report")?;
        decode_report(&payload)
    }
}
