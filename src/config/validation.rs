//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, capacity > 0)
//! - Check addresses that must parse up front
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.service must not be empty")]
    EmptyService,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.service.trim().is_empty() {
        errors.push(ValidationError::EmptyService);
    }
    if config.timeouts.idle_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.idle_secs"));
    }
    if config.timeouts.backpressure_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.backpressure_secs"));
    }
    if config.queue.capacity == 0 {
        errors.push(ValidationError::ZeroValue("queue.capacity"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
