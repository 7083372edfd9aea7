//! Bounded frame queue between the decoder and the agent.
//!
//! # Semantics
//! - FIFO, one producer (decoder) and one consumer (agent) per connection
//! - `push` waits at most `max_delay` for room; past that the connection
//!   is abandoned by the caller
//! - `close` consumes the sender, so the queue is closed at most once

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

use crate::protocol::Frame;

/// Default queue depth per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Why a push did not land in the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    /// The queue stayed full for the whole delay.
    #[error("queue full for {0:?}")]
    Busy(Duration),

    /// The agent dropped its end of the queue.
    #[error("agent closed its queue")]
    ConsumerGone,
}

/// Create a bounded queue.
///
/// `capacity` must be non-zero; config validation enforces this.
pub fn channel(capacity: usize, max_delay: Duration) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (FrameSender { tx, max_delay }, FrameReceiver { rx })
}

/// Producer end, owned by the decode loop.
#[derive(Debug)]
pub struct FrameSender {
    tx: mpsc::Sender<Frame>,
    max_delay: Duration,
}

impl FrameSender {
    /// Enqueue a frame, waiting up to the configured delay for room.
    pub async fn push(&self, frame: Frame) -> Result<(), PushError> {
        match self.tx.send_timeout(frame, self.max_delay).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(PushError::Busy(self.max_delay)),
            Err(SendTimeoutError::Closed(_)) => Err(PushError::ConsumerGone),
        }
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Signal end-of-stream to the agent.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Consumer end, handed to the agent.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<Frame>,
}

impl FrameReceiver {
    /// Next frame in wire order; `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Frames currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
