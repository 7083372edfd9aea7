//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection:
//!     → ban_list.rs (is the peer IP banned?)
//!     → banned: closed silently, nothing read
//!     → admitted: handed to the connection handler
//! ```
//!
//! # Design Decisions
//! - The filter is injected, never global, so tests swap in fakes
//! - Checked before any byte is read from the peer
//! - No log line and no metric for refused peers

pub mod ban_list;

pub use ban_list::{AllowAll, BanFilter, BanList, BanListError, DenyAll};
