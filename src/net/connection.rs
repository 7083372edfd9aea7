//! Connection identity, lifecycle tracking, and the agent-facing handle.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count live connections for shutdown and metrics
//! - Give the agent a write handle that dies with the connection

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{watch, Mutex};

use crate::observability::metrics;
use crate::protocol::encode_frame;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts admitted connections that still have a live handler.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_connection_opened();
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_connection_released();
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}

/// The agent's view of its connection.
///
/// Cheap to clone. Once the handler tears the connection down, writes fail
/// with [`io::ErrorKind::NotConnected`] and [`closed`](Self::closed) resolves.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: ConnectionId,
    peer_addr: SocketAddr,
    writer: Mutex<Option<OwnedWriteHalf>>,
    closed: watch::Sender<bool>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: ConnectionId, peer_addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(HandleInner {
                id,
                peer_addr,
                writer: Mutex::new(Some(writer)),
                closed,
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Resolves once the connection has been torn down.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        wait_closed(&mut rx).await;
    }

    /// Write raw bytes to the peer.
    ///
    /// A write stuck on a slow peer is abandoned when the connection closes.
    pub async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut rx = self.inner.closed.subscribe();
        if *rx.borrow_and_update() {
            return Err(not_connected());
        }

        let mut writer = tokio::select! {
            guard = self.inner.writer.lock() => guard,
            _ = wait_closed(&mut rx) => return Err(not_connected()),
        };
        let stream = writer.as_mut().ok_or_else(not_connected)?;

        tokio::select! {
            res = stream.write_all(buf) => res,
            _ = wait_closed(&mut rx) => Err(not_connected()),
        }
    }

    /// Encode `payload` as a frame and write it to the peer.
    pub async fn send_frame(&self, payload: &[u8]) -> io::Result<()> {
        let encoded =
            encode_frame(payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.write_all(&encoded).await
    }

    /// Mark closed and shut the write side down.
    pub(crate) async fn close(&self) {
        self.inner.closed.send_replace(true);
        let mut writer = self.inner.writer.lock().await;
        if let Some(mut stream) = writer.take() {
            let _ = stream.shutdown().await;
        }
    }

    /// Synchronous close for drop paths; a writer mid-write is released by the flag.
    pub(crate) fn close_now(&self) {
        self.inner.closed.send_replace(true);
        if let Ok(mut writer) = self.inner.writer.try_lock() {
            writer.take();
        }
    }
}

async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    // The sender outlives every receiver, so this only returns once the flag is set.
    let _ = rx.wait_for(|closed| *closed).await;
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}
