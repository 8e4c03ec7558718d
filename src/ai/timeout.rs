//! Completion Timeouts
//!
//! Bounds every upstream call so a hung completion surfaces as
//! `PathwayError::UpstreamTimeout` instead of blocking the session.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let timeouts = TimeoutConfig::from_llm(&config.llm);
//! let text = with_timeout(
//!     timeouts.attempt,
//!     client.complete(&prompt, None),
//!     "pathway generation"
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::constants::network as net_constants;
use crate::constants::retry as retry_constants;
use crate::types::{PathwayError, Result};

/// Timeouts applied around the completion service
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One HTTP round trip
    pub attempt: Duration,
    /// Whole completion request: every attempt plus the waits between them
    pub completion: Duration,
    /// TCP/TLS connect phase
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let attempt = Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS);
        Self {
            attempt,
            completion: completion_budget(attempt, retry_constants::DEFAULT_MAX_RETRIES),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_llm(config: &LlmConfig) -> Self {
        let attempt = Duration::from_secs(config.timeout_secs);
        Self {
            attempt,
            completion: completion_budget(attempt, config.max_retries),
            ..Self::default()
        }
    }
}

/// Upper bound for `max_retries + 1` attempts with the longest backoff between each
pub fn completion_budget(attempt: Duration, max_retries: u8) -> Duration {
    let retries = u32::from(max_retries);
    attempt * (retries + 1) + Duration::from_secs(retry_constants::MAX_DELAY_SECS) * retries
}

/// Execute an async operation with a timeout
///
/// Returns `UpstreamTimeout` if the operation doesn't complete within the
/// specified duration. The inner future is dropped on expiry.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(PathwayError::timeout(operation_name, timeout)),
    }
}
