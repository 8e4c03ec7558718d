//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/pathwright/) and project (.pathwright/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{ingest, network, prompt, retry, session};
use crate::types::{PathwayError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion provider settings
    pub llm: LlmConfig,

    /// Interactive session settings
    pub session: SessionConfig,

    /// File ingestion settings
    pub ingest: IngestConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            session: SessionConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `PathwayError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(PathwayError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(PathwayError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.session.history_limit == 0 {
            return Err(PathwayError::Config(
                "Session history_limit must be greater than 0".to_string(),
            ));
        }

        if self.ingest.max_concurrency == 0 {
            return Err(PathwayError::Config(
                "Ingest max_concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,

    /// Custom API endpoint
    pub api_base: Option<String>,

    /// API key; falls back to GEMINI_API_KEY. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Retries after the first failed call
    pub max_retries: u8,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            max_output_tokens: 8192,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Past pathways kept in history
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: session::DEFAULT_HISTORY_LIMIT,
        }
    }
}

// =============================================================================
// Ingest Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Concurrent extraction tasks
    pub max_concurrency: usize,

    /// Source characters per file included in the prompt
    pub max_chars_per_file: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrency: ingest::DEFAULT_MAX_CONCURRENCY,
            max_chars_per_file: prompt::DEFAULT_MAX_CHARS_PER_FILE,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "gemini");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.history_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingest.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret-key".to_string());

        let debug = format!("{:?}", config.llm);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
