//! Frame type and encoder.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the length prefix in bytes.
pub const HEADER_SIZE: usize = 2;

/// Largest payload a 16-bit length prefix can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Errors raised while building frames for the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload of {size} bytes exceeds maximum frame size {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

/// One decoded message.
///
/// Each frame owns its own allocation, so it can cross into the agent task
/// without aliasing the decoder's buffers.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap a freshly read payload.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload: Bytes::from(payload),
        }
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Consume the frame, returning the payload.
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

/// Encode a payload as `[BE16(len)][payload]`.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    Ok(buf.freeze())
}
