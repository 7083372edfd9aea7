//! Frame decoder.
//!
//! Reads `[BE16 length][payload]` frames off a byte stream. Every header read
//! gets a fresh idle deadline; the payload that follows shares it.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::frame::{Frame, HEADER_SIZE};
use crate::resilience::timeouts::ReadDeadline;

/// Abnormal ends of the decode loop. A clean peer close is not an error.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("error receiving header: {0}")]
    HeaderRead(#[source] io::Error),

    #[error("no header received within {0:?}")]
    IdleTimeout(Duration),

    #[error("error receiving payload of {expected} bytes: {source}")]
    PayloadRead {
        expected: usize,
        #[source]
        source: io::Error,
    },

    #[error("payload of {expected} bytes not received before read deadline")]
    PayloadTimeout { expected: usize },
}

/// Stateful per-connection decoder.
pub struct FrameDecoder<R> {
    reader: R,
    deadline: ReadDeadline,
    header: [u8; HEADER_SIZE],
}

impl<R> FrameDecoder<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, idle_timeout: Duration) -> Self {
        Self {
            reader,
            deadline: ReadDeadline::new(idle_timeout),
            header: [0; HEADER_SIZE],
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream on a frame boundary.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        self.deadline.refresh();

        let got_header = match self
            .deadline
            .run(read_header(&mut self.reader, &mut self.header))
            .await
        {
            Ok(res) => res.map_err(DecodeError::HeaderRead)?,
            Err(_) => return Err(DecodeError::IdleTimeout(self.deadline.idle())),
        };
        if !got_header {
            return Ok(None);
        }

        let size = u16::from_be_bytes(self.header) as usize;
        // Fresh buffer per frame; it is handed to another task.
        let mut payload = vec![0u8; size];

        match self.deadline.run(self.reader.read_exact(&mut payload)).await {
            Ok(Ok(_)) => Ok(Some(Frame::new(payload))),
            Ok(Err(source)) => Err(DecodeError::PayloadRead {
                expected: size,
                source,
            }),
            Err(_) => Err(DecodeError::PayloadTimeout { expected: size }),
        }
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Fill `header`, returning `false` on EOF before the first byte.
async fn read_header<R>(reader: &mut R, header: &mut [u8; HEADER_SIZE]) -> io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside frame header",
            ));
        }
        filled += n;
    }
    Ok(true)
}
