//! Completion Provider Abstraction
//!
//! Defines the `CompletionClient` trait: prompt text in, raw completion text
//! out. Providers never parse the text; that is the recovery parser's job.
//!
//! ## Modules
//!
//! - `gemini`: Gemini REST `generateContent` client
//! - `retry`: bounded retry wrapper with exponential backoff and jitter

mod gemini;
mod retry;

pub use gemini::GeminiProvider;
pub use retry::{RetryConfig, RetryingClient};

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{PathwayError, Result};

/// Shared client type passed to generators and the chat assistant
pub type SharedClient = Arc<dyn CompletionClient>;

// =============================================================================
// Completion Client Trait
// =============================================================================

/// Text completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion for `prompt`.
    ///
    /// `schema_hint` asks the service for JSON output when present.
    /// Fails with `UpstreamUnavailable`, `UpstreamTimeout` or a categorized
    /// `Llm` error.
    async fn complete(&self, prompt: &str, schema_hint: Option<&str>) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(&self, prompt: &str, schema_hint: Option<&str>) -> Result<String> {
        (**self).complete(prompt, schema_hint).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Create a shared, retrying client from configuration
pub fn create_provider(config: &LlmConfig) -> Result<SharedClient> {
    match config.provider.as_str() {
        "gemini" => {
            let provider = GeminiProvider::new(config)?;
            Ok(Arc::new(RetryingClient::new(
                provider,
                RetryConfig::from_llm(config),
            )))
        }
        _ => Err(PathwayError::Config(format!(
            "Unknown provider: {}. Supported: gemini",
            config.provider
        ))),
    }
}

// =============================================================================
// Test Doubles
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Replays queued results in order; the last result repeats once drained
    pub struct ScriptedClient {
        script: Mutex<VecDeque<Result<String>>>,
        delay: Option<Duration>,
        delays: Mutex<VecDeque<Duration>>,
        pub calls: AtomicU32,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn new(script: Vec<Result<String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                delay: None,
                delays: Mutex::new(VecDeque::new()),
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Per-call delays consumed in order before falling back to `with_delay`
        pub fn with_delays(self, delays: Vec<Duration>) -> Self {
            *self.delays.lock().unwrap() = delays.into();
            self
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    fn replay(result: &Result<String>) -> Result<String> {
        match result {
            Ok(text) => Ok(text.clone()),
            Err(PathwayError::Llm(e)) => Err(PathwayError::Llm(e.clone())),
            Err(PathwayError::UpstreamUnavailable(m)) => {
                Err(PathwayError::UpstreamUnavailable(m.clone()))
            }
            Err(other) => Err(PathwayError::UpstreamUnavailable(other.to_string())),
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str, _schema_hint: Option<&str>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            let delay = self.delays.lock().unwrap().pop_front().or(self.delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                replay(script.front().unwrap())
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }
}
