//! Accept loop.
//!
//! # Responsibilities
//! - Accept connections until shutdown
//! - Refuse banned peers before reading anything from them
//! - Spawn one handler per admitted connection and keep track of it
//! - Drain handlers on shutdown, aborting stragglers after the grace period

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};

use crate::agent::Consumer;
use crate::config::ConnectionSettings;
use crate::net::connection::ConnectionTracker;
use crate::net::handler::{ConnectionHandler, ConnectionOutcome};
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;
use crate::security::BanFilter;

/// Pause after a failed accept; errors like EMFILE persist until a descriptor frees up.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Top-level accept loop.
pub struct Acceptor<B, C> {
    listener: Listener,
    ban_filter: Arc<B>,
    consumer: Arc<C>,
    settings: ConnectionSettings,
    tracker: ConnectionTracker,
    handlers: JoinSet<ConnectionOutcome>,
}

impl<B, C> Acceptor<B, C>
where
    B: BanFilter,
    C: Consumer,
{
    pub fn new(
        listener: Listener,
        ban_filter: Arc<B>,
        consumer: Arc<C>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            listener,
            ban_filter,
            consumer,
            settings,
            tracker: ConnectionTracker::new(),
            handlers: JoinSet::new(),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared view of the live connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept until `shutdown` fires, then drain open connections.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>, grace: Duration) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                Some(res) = self.handlers.join_next(), if !self.handlers.is_empty() => {
                    reap(res);
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => self.admit(stream, peer_addr),
                    Err(e) => accept_failed(e).await,
                }
            }
        }

        self.drain(grace).await;
    }

    fn admit(&mut self, stream: TcpStream, peer_addr: SocketAddr) {
        if self.ban_filter.is_banned(peer_addr.ip()) {
            drop(stream);
            return;
        }

        let guard = self.tracker.track();
        tracing::debug!(connection_id = %guard.id(), peer_addr = %peer_addr, "Connection accepted");

        let handler = ConnectionHandler::new(Arc::clone(&self.consumer), self.settings);
        self.handlers.spawn(handler.run(stream, peer_addr, guard));
    }

    async fn drain(mut self, grace: Duration) {
        drop(self.listener);
        if self.handlers.is_empty() {
            return;
        }

        tracing::info!(open = self.handlers.len(), "Draining connections");
        let handlers = &mut self.handlers;
        let drained = tokio::time::timeout(grace, async {
            while let Some(res) = handlers.join_next().await {
                reap(res);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = self.handlers.len(),
                "Grace period elapsed, aborting connections"
            );
            self.handlers.shutdown().await;
        }
    }
}

async fn accept_failed(e: ListenerError) {
    tracing::warn!(error = %e, "Accept failed");
    metrics::record_accept_error();
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

fn reap(res: Result<ConnectionOutcome, JoinError>) {
    match res {
        Ok(outcome) => tracing::trace!(outcome = outcome.as_str(), "Handler finished"),
        Err(e) if e.is_panic() => tracing::error!(error = %e, "Connection handler panicked"),
        Err(_) => {}
    }
}
