//! TCP ingress gateway library.
//!
//! Accepts client connections, refuses banned peers, decodes length-prefixed
//! frames, and feeds them to a per-connection agent through a bounded queue.

pub mod agent;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod resilience;
pub mod security;

pub use agent::{Consumer, LoggingAgent};
pub use config::schema::GatewayConfig;
pub use lifecycle::Shutdown;
pub use protocol::Frame;
