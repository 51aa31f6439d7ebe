//! Execution Timeout Management
//!
//! This module provides the timeout applied to every subprocess execution.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Default timeout for command execution in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Execution timeout configuration
///
/// Timeouts are enforced to prevent commands from hanging indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTimeout {
    /// The timeout duration
    duration: Duration,
}

impl Default for ExecutionTimeout {
    fn default() -> Self {
        Self::from_secs(DEFAULT_TIMEOUT_SECS)
    }
}

impl From<Duration> for ExecutionTimeout {
    fn from(duration: Duration) -> Self {
        Self::new(duration)
    }
}

impl ExecutionTimeout {
    /// Create a new execution timeout
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use hypernode_mcp::exec::ExecutionTimeout;
    ///
    /// let timeout = ExecutionTimeout::new(Duration::from_secs(60));
    /// assert_eq!(timeout.to_string(), "60");
    /// ```
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Create a timeout from seconds
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Get the timeout duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Drive a future to completion, or give up once the timeout elapses
    ///
    /// Returns `None` when the timeout fired. The future is dropped at that
    /// point, releasing anything it borrowed.
    pub async fn run<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        time::timeout(self.duration, future).await.ok()
    }
}

/// Formats as a number of seconds, with a fractional part only when needed
impl fmt::Display for ExecutionTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.duration.subsec_nanos() == 0 {
            write!(f, "{}", self.duration.as_secs())
        } else {
            write!(f, "{}", self.duration.as_secs_f64())
        }
    }
}
