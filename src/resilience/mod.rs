//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Per connection:
//!     → timeouts.rs (idle deadline on every header read)
//!     → backpressure.rs (bounded queue, bounded wait for room)
//!     → On expiry: the handler tears the connection down
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every blocking step on the ingress path has a deadline
//! - A slow agent costs its own connection, never the accept loop
//! - The agent's receive side is unbounded in time; that is the agent's concern

pub mod backpressure;
pub mod timeouts;
