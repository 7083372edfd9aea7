//! Connection handler: one accepted connection, end to end.
//!
//! # Lifecycle
//! ```text
//! spawn agent (queue rx + handle)
//!     → decode loop: header → payload → push (bounded wait)
//!     → on exit: close queue, close socket, wait for agent
//! ```
//!
//! The queue is closed on every exit path, including a backpressure
//! abandonment; frames already queued stay readable by the agent.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::agent::Consumer;
use crate::config::ConnectionSettings;
use crate::net::connection::{ConnectionGuard, ConnectionHandle, ConnectionId};
use crate::observability::metrics;
use crate::protocol::{DecodeError, FrameDecoder};
use crate::resilience::backpressure::{self, FrameSender, PushError};

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Peer closed on a frame boundary.
    PeerClosed,
    /// Read error or EOF inside a frame.
    ReadFailed,
    /// No header within the idle timeout.
    IdleTimeout,
    /// Queue stayed full past the backpressure delay.
    Busy,
    /// Agent dropped its queue.
    AgentGone,
}

impl ConnectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionOutcome::PeerClosed => "peer_closed",
            ConnectionOutcome::ReadFailed => "read_failed",
            ConnectionOutcome::IdleTimeout => "idle_timeout",
            ConnectionOutcome::Busy => "busy",
            ConnectionOutcome::AgentGone => "agent_gone",
        }
    }
}

/// Owns one connection until it closes.
pub struct ConnectionHandler<C> {
    consumer: Arc<C>,
    settings: ConnectionSettings,
}

impl<C: Consumer> ConnectionHandler<C> {
    pub fn new(consumer: Arc<C>, settings: ConnectionSettings) -> Self {
        Self { consumer, settings }
    }

    /// Run the connection to completion.
    pub async fn run(
        self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        guard: ConnectionGuard,
    ) -> ConnectionOutcome {
        let id = guard.id();
        let (read_half, write_half) = stream.into_split();
        let handle = ConnectionHandle::new(id, peer_addr, write_half);
        let _close_on_drop = CloseOnDrop(handle.clone());

        let (frames_tx, frames_rx) =
            backpressure::channel(self.settings.queue_capacity, self.settings.backpressure_delay);

        // Agent is running before the first read.
        let agent = AgentTask::spawn(Arc::clone(&self.consumer), frames_rx, handle.clone());

        let mut decoder = FrameDecoder::new(read_half, self.settings.idle_timeout);
        let outcome = decode_loop(&mut decoder, &frames_tx, id, peer_addr).await;

        frames_tx.close();
        drop(decoder);
        handle.close().await;
        metrics::record_connection_closed(outcome.as_str());

        agent.join(id).await;
        drop(guard);
        outcome
    }
}

async fn decode_loop<R>(
    decoder: &mut FrameDecoder<R>,
    frames: &FrameSender,
    id: ConnectionId,
    peer_addr: SocketAddr,
) -> ConnectionOutcome
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match decoder.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Peer closed connection");
                return ConnectionOutcome::PeerClosed;
            }
            Err(e @ DecodeError::IdleTimeout(_)) => {
                tracing::warn!(connection_id = %id, peer_addr = %peer_addr, error = %e, "Connection idle");
                return ConnectionOutcome::IdleTimeout;
            }
            Err(e) => {
                tracing::warn!(connection_id = %id, peer_addr = %peer_addr, error = %e, "Connection read failed");
                return ConnectionOutcome::ReadFailed;
            }
        };

        metrics::record_frame(frame.len());

        if let Err(e) = frames.push(frame).await {
            tracing::warn!(connection_id = %id, peer_addr = %peer_addr, error = %e, "server busy or agent closed");
            return match e {
                PushError::Busy(_) => ConnectionOutcome::Busy,
                PushError::ConsumerGone => ConnectionOutcome::AgentGone,
            };
        }
    }
}

/// Tears the connection down if the handler is dropped mid-flight.
struct CloseOnDrop(ConnectionHandle);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if !self.0.is_closed() {
            self.0.close_now();
        }
    }
}

/// The connection's agent; aborted if the handler goes away first.
struct AgentTask(Option<JoinHandle<()>>);

impl AgentTask {
    fn spawn<C: Consumer>(
        consumer: Arc<C>,
        frames: backpressure::FrameReceiver,
        handle: ConnectionHandle,
    ) -> Self {
        Self(Some(tokio::spawn(async move {
            consumer.consume(frames, handle).await;
        })))
    }

    async fn join(mut self, id: ConnectionId) {
        if let Some(task) = self.0.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(connection_id = %id, "Agent panicked");
                }
            }
        }
    }
}

impl Drop for AgentTask {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}
