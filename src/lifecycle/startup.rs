//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the ban list and start its watcher
//! - Install the metrics exporter when enabled
//! - Bind the listener and build the acceptor
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::agent::Consumer;
use crate::config::watcher::BanListWatcher;
use crate::config::GatewayConfig;
use crate::net::acceptor::Acceptor;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;
use crate::security::{BanList, BanListError};

/// Fatal errors while bringing the gateway up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("ban list: {0}")]
    BanList(#[from] BanListError),

    #[error("ban list watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// A bound, ready-to-run gateway.
pub struct Gateway<C> {
    acceptor: Acceptor<BanList, C>,
    ban_list: Arc<BanList>,
    grace: Duration,
    _watcher: Option<RecommendedWatcher>,
}

impl<C: Consumer> Gateway<C> {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }

    /// The live ban list; changes apply to the next accepted connection.
    pub fn ban_list(&self) -> Arc<BanList> {
        Arc::clone(&self.ban_list)
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.acceptor.tracker()
    }

    /// Accept until shutdown, then drain.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        self.acceptor.run(shutdown, self.grace).await;
    }
}

/// Bring up every subsystem the acceptor depends on and bind the listener.
pub async fn start<C: Consumer>(
    config: &GatewayConfig,
    consumer: Arc<C>,
) -> Result<Gateway<C>, StartupError> {
    let ban_list = Arc::new(match &config.security.ban_list_path {
        Some(path) => BanList::from_file(Path::new(path))?,
        None => BanList::new(),
    });
    tracing::info!(entries = ban_list.len(), "Ban list loaded");

    let watcher = match &config.security.ban_list_path {
        Some(path) if config.security.watch_ban_list => {
            Some(BanListWatcher::new(Path::new(path), Arc::clone(&ban_list)).run()?)
        }
        _ => None,
    };

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    let acceptor = Acceptor::new(
        listener,
        Arc::clone(&ban_list),
        consumer,
        config.connection_settings(),
    );

    Ok(Gateway {
        acceptor,
        ban_list,
        grace: config.shutdown_grace(),
        _watcher: watcher,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::LoggingAgent;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn local_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.listener.service = "127.0.0.1:0".into();
        config
    }

    #[tokio::test]
    async fn starts_with_ban_list_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "203.0.113.5").unwrap();

        let mut config = local_config();
        config.security.ban_list_path = Some(file.path().display().to_string());
        config.security.watch_ban_list = false;

        let gateway = start(&config, Arc::new(LoggingAgent)).await.unwrap();
        assert_eq!(gateway.ban_list().len(), 1);
        assert!(gateway.local_addr().unwrap().port() != 0);
    }

    #[tokio::test]
    async fn bad_ban_list_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not an address").unwrap();

        let mut config = local_config();
        config.security.ban_list_path = Some(file.path().display().to_string());

        let err = start(&config, Arc::new(LoggingAgent)).await.err().unwrap();
        assert!(matches!(err, StartupError::BanList(_)));
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = local_config();
        config.listener.service = taken.local_addr().unwrap().to_string();

        let err = start(&config, Arc::new(LoggingAgent)).await.err().unwrap();
        assert!(matches!(err, StartupError::Listener(ListenerError::Bind(_))));
    }
}
