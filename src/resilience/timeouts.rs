//! Timeout enforcement.
//!
//! # Responsibilities
//! - Hold the default idle and backpressure limits
//! - Provide the per-connection read deadline used by the frame decoder
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities (`timeout_at`), no socket options
//! - A deadline is refreshed before each header read; the payload read of the
//!   same frame runs against the same instant

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;
use tokio::time::Instant;

/// Longest wait for the next frame header.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest wait for room in a full backpressure queue.
pub const DEFAULT_BACKPRESSURE_DELAY: Duration = Duration::from_secs(60);

/// Stand-in for "never" when `now + idle` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A resettable read deadline.
#[derive(Debug, Clone, Copy)]
pub struct ReadDeadline {
    idle: Duration,
    at: Instant,
}

impl ReadDeadline {
    /// Create a deadline `idle` from now.
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            at: deadline_after(idle),
        }
    }

    /// Push the deadline to `now + idle`.
    pub fn refresh(&mut self) {
        self.at = deadline_after(self.idle);
    }

    /// The configured idle window.
    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// The instant the current window expires.
    pub fn expires_at(&self) -> Instant {
        self.at
    }

    /// Run `fut` until it completes or the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        tokio::time::timeout_at(self.at, fut).await
    }
}

fn deadline_after(idle: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(idle).unwrap_or_else(|| now + FAR_FUTURE)
}
