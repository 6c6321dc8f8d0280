//! Timeout utilities for the blocking edges of the pipeline.
//!
//! Probing and extraction are the only steps that wait on the outside
//! world; both go through `with_timeout` so a hung child can never stall an
//! analysis past its budget.

use crate::error::{Result, UnattendError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Timeout configuration for a single guarded operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Whether to log timeout warnings
    pub log_warnings: bool,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    pub fn new(duration: Duration, operation: impl Into<String>) -> Self {
        Self {
            duration,
            log_warnings: true,
            operation_name: operation.into(),
        }
    }

    pub fn from_millis(millis: u64, operation: impl Into<String>) -> Self {
        Self::new(Duration::from_millis(millis), operation)
    }

    pub fn quiet(mut self) -> Self {
        self.log_warnings = false;
        self
    }
}

/// Execute an async operation with a timeout.
///
/// The guarded future is dropped on expiry, which is what kills children
/// spawned with `kill_on_drop(true)`.
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        "Starting operation '{}' with timeout of {}ms",
        config.operation_name,
        config.duration.as_millis()
    );

    match timeout(config.duration, future).await {
        Ok(result) => result,
        Err(_) => {
            if config.log_warnings {
                warn!(
                    "Operation '{}' timed out after {}ms",
                    config.operation_name,
                    config.duration.as_millis()
                );
            }
            Err(UnattendError::ProcessTimeout {
                millis: config.duration.as_millis() as u64,
            })
        }
    }
}
