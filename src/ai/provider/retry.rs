//! Retrying Completion Client
//!
//! Wraps any `CompletionClient` with bounded retries:
//!
//! - **Exponential Backoff**: With random jitter using `rand` crate
//! - **Rate Limit Aware**: Honors `retry_after` hints, capped at `max_delay`
//! - **Per-attempt Timeout**: A hung attempt becomes `UpstreamTimeout` and is retried
//! - **Blank Replies**: Whitespace-only text is retried, then surfaces as `EmptyResponse`
//! - **Fail Fast**: Auth, bad-request and token-limit errors are returned at once

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::CompletionClient;
use crate::ai::timeout::{TimeoutConfig, with_timeout};
use crate::config::LlmConfig;
use crate::constants::retry as retry_constants;
use crate::types::{PathwayError, Result};

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u8,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    pub backoff_factor: f32,
    /// Bound on a single attempt
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
            backoff_factor: retry_constants::BACKOFF_FACTOR,
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    pub fn from_llm(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            attempt_timeout: Some(TimeoutConfig::from_llm(config).attempt),
            ..Self::default()
        }
    }
}

/// Completion client that retries recoverable failures
pub struct RetryingClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: CompletionClient> RetryingClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Delay before the next attempt, or None when the error must not be retried
    fn retry_delay(&self, err: &PathwayError, backoff: Duration) -> Option<Duration> {
        if !err.is_recoverable() {
            return None;
        }

        let jittered = backoff + random_jitter(backoff);
        let delay = match err {
            PathwayError::Llm(llm) => llm.recommended_delay().max(jittered),
            _ => jittered,
        };
        Some(delay.min(self.config.max_delay))
    }

    async fn attempt(&self, prompt: &str, schema_hint: Option<&str>) -> Result<String> {
        let text = match self.config.attempt_timeout {
            Some(limit) => {
                with_timeout(limit, self.inner.complete(prompt, schema_hint), "completion attempt")
                    .await?
            }
            None => self.inner.complete(prompt, schema_hint).await?,
        };

        if text.trim().is_empty() {
            return Err(PathwayError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for RetryingClient<C> {
    #[instrument(skip(self, prompt, schema_hint), fields(provider = self.inner.name(), max_retries = self.config.max_retries))]
    async fn complete(&self, prompt: &str, schema_hint: Option<&str>) -> Result<String> {
        let mut backoff = self.config.base_delay;
        let mut attempt: u8 = 0;

        loop {
            attempt += 1;
            debug!(attempt, "Completion attempt");

            let err = match self.attempt(prompt, schema_hint).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!(attempts = attempt, "Completion succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            if attempt > self.config.max_retries {
                warn!(attempts = attempt, error = %err, "Retries exhausted");
                return Err(err);
            }

            let Some(delay) = self.retry_delay(&err, backoff) else {
                info!(error = %err, "Non-retryable completion error");
                return Err(err);
            };

            warn!(
                attempt,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Completion failed, retrying after backoff"
            );
            sleep(delay).await;
            backoff = calculate_backoff(backoff, self.config.backoff_factor, self.config.max_delay);
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

/// Generate random jitter using thread-local RNG
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let jitter_ms = rand::rng().random_range(0..max_jitter_ms);
    Duration::from_millis(jitter_ms)
}

/// Calculate exponential backoff with cap
fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    let next = Duration::from_secs_f32(current.as_secs_f32() * factor);
    std::cmp::min(next, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::ScriptedClient;
    use crate::types::{ErrorCategory, LlmError};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_factor: 2.0,
            attempt_timeout: None,
        }
    }

    fn transient() -> Result<String> {
        Err(LlmError::new(ErrorCategory::Transient, "503 overloaded").into())
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![transient(), transient(), Ok("done".to_string())]),
            fast(),
        );

        assert_eq!(client.complete("p", None).await.unwrap(), "done");
        assert_eq!(client.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_retries_bounded() {
        let client = RetryingClient::new(ScriptedClient::new(vec![transient()]), fast());

        assert!(client.complete("p", None).await.is_err());
        assert_eq!(client.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_auth_not_retried() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![Err(LlmError::new(ErrorCategory::Auth, "401").into())]),
            fast(),
        );

        let err = client.complete("p", None).await.unwrap_err();
        assert!(matches!(err, PathwayError::Llm(ref e) if e.category == ErrorCategory::Auth));
        assert_eq!(client.inner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_hint_capped() {
        let client = RetryingClient::new(ScriptedClient::new(vec![]), fast());
        let err: PathwayError = LlmError::new(ErrorCategory::RateLimit, "429")
            .retry_after(Duration::from_secs(30))
            .into();

        assert_eq!(
            client.retry_delay(&err, Duration::from_millis(1)),
            Some(Duration::from_millis(5))
        );
    }

    #[tokio::test]
    async fn test_blank_reply_retried_then_surfaced() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![Ok("   ".to_string()), Ok("{\"a\":1}".to_string())]),
            fast(),
        );
        assert_eq!(client.complete("p", None).await.unwrap(), "{\"a\":1}");
        assert_eq!(client.inner().call_count(), 2);

        let always_blank = RetryingClient::new(ScriptedClient::replying("\n"), fast());
        let err = always_blank.complete("p", None).await.unwrap_err();
        assert!(matches!(err, PathwayError::EmptyResponse));
        assert_eq!(always_blank.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_hung_attempt_times_out_and_retries() {
        let inner = ScriptedClient::replying("done")
            .with_delays(vec![Duration::from_millis(500), Duration::ZERO]);
        let client = RetryingClient::new(
            inner,
            RetryConfig {
                attempt_timeout: Some(Duration::from_millis(20)),
                ..fast()
            },
        );

        assert_eq!(client.complete("p", None).await.unwrap(), "done");
        assert_eq!(client.inner().call_count(), 2);
    }

    #[test]
    fn test_category_delay_is_a_floor() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![]),
            RetryConfig {
                max_delay: Duration::from_secs(60),
                ..fast()
            },
        );
        let err: PathwayError = LlmError::new(ErrorCategory::Network, "connection reset").into();

        assert_eq!(
            client.retry_delay(&err, Duration::from_millis(1)),
            Some(ErrorCategory::Network.recommended_delay())
        );
        assert_eq!(
            client.retry_delay(&PathwayError::structural("x"), Duration::from_millis(1)),
            None
        );
    }

    #[test]
    fn test_calculate_backoff_caps() {
        let next = calculate_backoff(Duration::from_secs(20), 2.0, Duration::from_secs(30));
        assert_eq!(next, Duration::from_secs(30));
        assert!(random_jitter(Duration::from_millis(100)) < Duration::from_millis(25));
    }
}
