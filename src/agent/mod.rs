//! Per-connection agents.
//!
//! An agent is the task on the far side of a connection's frame queue. The
//! handler spawns exactly one per connection, before the first byte is read,
//! and hands it the receive end of the queue plus a [`ConnectionHandle`].
//!
//! What an agent does with frames (forwarding to hub, event or stats
//! services) is its own business; the gateway only guarantees FIFO delivery
//! and end-of-stream when the connection ends.

use std::future::Future;

use crate::net::connection::ConnectionHandle;
use crate::resilience::backpressure::FrameReceiver;

/// Application logic for one connection.
pub trait Consumer: Send + Sync + 'static {
    /// Drain `frames` until the queue ends.
    fn consume(
        &self,
        frames: FrameReceiver,
        conn: ConnectionHandle,
    ) -> impl Future<Output = ()> + Send;
}

/// Default agent: drains frames and logs their sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAgent;

impl Consumer for LoggingAgent {
    async fn consume(&self, mut frames: FrameReceiver, conn: ConnectionHandle) {
        let mut count = 0u64;
        let mut bytes = 0usize;

        while let Some(frame) = frames.recv().await {
            count += 1;
            bytes += frame.len();
            tracing::debug!(
                connection_id = %conn.id(),
                len = frame.len(),
                "Frame received"
            );
        }

        tracing::debug!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer_addr(),
            frames = count,
            bytes,
            "Agent finished"
        );
    }
}
