//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → ConnectionSettings copied into every connection
//!
//! On ban-list file change:
//!     watcher.rs detects change
//!     → ban list file re-read
//!     → entries swapped into the shared BanList
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the ban list reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::ConnectionSettings;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
