//! Length-prefixed framing: a 4-byte big-endian length, then the payload.

use std::io::{ErrorKind, Read, Write};

use anyhow::{anyhow, Context, Result};

/// Largest payload accepted by default (32 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 32 * 1024 * 1024;

/// Read one frame. Fails on a short read or a length above `max_len`.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            anyhow!("connection closed before frame length")
        } else {
            anyhow!("failed to read frame length: {}", e)
        }
    })?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_len {
        return Err(anyhow!(
            "frame of {} bytes exceeds limit of {} bytes",
            len,
            max_len
        ));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .with_context(|| format!("truncated frame: expected {} payload bytes", len))?;
    Ok(payload)
}

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| anyhow!("payload of {} bytes does not fit a frame", payload.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}
