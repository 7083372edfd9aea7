//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → acceptor.rs (ban check, spawn, track)
//!     → handler.rs (agent spawn, decode loop, teardown)
//!     → connection.rs (ids, live count, agent-facing handle)
//!
//! Connection States:
//!     Accepted → (Refused | Active) → Closed
//! ```
//!
//! # Design Decisions
//! - Connection-level failures stay inside their handler
//! - Each connection tracked for graceful shutdown
//! - Exactly one decoder and one agent per connection

pub mod acceptor;
pub mod connection;
pub mod handler;
pub mod listener;

pub use acceptor::Acceptor;
pub use connection::{ConnectionHandle, ConnectionId, ConnectionTracker};
pub use handler::{ConnectionHandler, ConnectionOutcome};
pub use listener::{Listener, ListenerError};
