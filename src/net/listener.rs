//! TCP listener implementation.
//!
//! # Responsibilities
//! - Resolve the configured service address (IPv4 only)
//! - Bind and accept incoming TCP connections
//! - Keep accept failures distinct from bind failures

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{lookup_host, TcpListener, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Service address did not resolve.
    #[error("Failed to resolve {service}: {source}")]
    Resolve {
        service: String,
        #[source]
        source: io::Error,
    },
    /// Service address resolved, but not to IPv4.
    #[error("No IPv4 address for {0}")]
    NoIpv4(String),
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[source] io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// Resolve `host:port` (or `:port`, meaning all interfaces) to an IPv4 socket address.
pub async fn resolve_service(service: &str) -> Result<SocketAddr, ListenerError> {
    let target = if service.starts_with(':') {
        format!("0.0.0.0{service}")
    } else {
        service.to_string()
    };

    let mut addrs = lookup_host(target.as_str())
        .await
        .map_err(|source| ListenerError::Resolve {
            service: service.to_string(),
            source,
        })?;

    addrs
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ListenerError::NoIpv4(service.to_string()))
}

/// The gateway's listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to the configured service address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = resolve_service(&config.service).await?;
        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            service = %config.service,
            address = %local_addr,
            "Listener bound"
        );

        Ok(Self { inner: listener })
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener) -> Self {
        Self { inner }
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        self.inner.accept().await.map_err(ListenerError::Accept)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bare_port_means_all_ipv4_interfaces() {
        let addr = resolve_service(":8080").await.unwrap();
        assert_eq!(addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn ipv6_only_address_is_rejected() {
        let err = resolve_service("[::1]:8080").await.unwrap_err();
        assert!(matches!(err, ListenerError::NoIpv4(_)));
    }

    #[tokio::test]
    async fn malformed_service_fails_to_resolve() {
        let err = resolve_service("no-port-here").await.unwrap_err();
        assert!(matches!(err, ListenerError::Resolve { .. }));
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let config = ListenerConfig {
            service: "127.0.0.1:0".into(),
        };
        let listener = Listener::bind(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.is_ipv4());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn port_in_use_is_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ListenerConfig {
            service: taken.local_addr().unwrap().to_string(),
        };
        let err = Listener::bind(&config).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind(_)));
    }
}
