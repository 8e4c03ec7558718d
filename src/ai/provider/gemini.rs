//! Gemini API Provider
//!
//! Completion provider using the Gemini `generateContent` REST endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use super::CompletionClient;
use crate::ai::timeout::TimeoutConfig;
use crate::config::LlmConfig;
use crate::types::{ErrorCategory, ErrorClassifier, LlmError, PathwayError, Result};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const PROVIDER_NAME: &str = "gemini";

/// Gemini API Provider with secure API key handling
pub struct GeminiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    endpoint: Url,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PathwayError::Config(format!(
                    "Gemini API key not found. Set {} env var or llm.api_key in config",
                    API_KEY_ENV
                ))
            })?;

        let api_base = config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');

        let endpoint = Url::parse(&format!(
            "{}/models/{}:generateContent",
            api_base, config.model
        ))
        .map_err(|e| PathwayError::Config(format!("Invalid api_base '{}': {}", api_base, e)))?;

        let timeouts = TimeoutConfig::from_llm(config);
        let client = reqwest::Client::builder()
            .timeout(timeouts.attempt)
            .connect_timeout(timeouts.connection)
            .build()
            .map_err(|e| PathwayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: timeouts.attempt,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_request(&self, prompt: &str, schema_hint: Option<&str>) -> GenerateContentRequest {
        let text = match schema_hint {
            Some(hint) => format!(
                "{}\n\nRespond ONLY with valid JSON matching:\n{}",
                prompt, hint
            ),
            None => prompt.to_string(),
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(text) }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: schema_hint.map(|_| "application/json".to_string()),
            },
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> PathwayError {
        if err.is_timeout() {
            return PathwayError::timeout("gemini generateContent", self.timeout);
        }
        if err.is_connect() {
            return LlmError::with_provider(ErrorCategory::Network, err.to_string(), PROVIDER_NAME)
                .retry_after(Duration::from_secs(5))
                .into();
        }
        ErrorClassifier::classify(&err.to_string(), PROVIDER_NAME).into()
    }
}

#[async_trait]
impl CompletionClient for GeminiProvider {
    async fn complete(&self, prompt: &str, schema_hint: Option<&str>) -> Result<String> {
        info!(
            "Generating with Gemini (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema_hint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Gemini API error ({}): {}", status, body),
                PROVIDER_NAME,
            )
            .into());
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PathwayError::UpstreamUnavailable(format!("Malformed Gemini envelope: {}", e)))?;

        debug!(
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Received response from Gemini"
        );

        body.into_text()
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    ///
    /// A blocked prompt is a non-retryable bad request. An empty candidate list
    /// without a block reason stays retryable.
    fn into_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => LlmError::with_provider(
                    ErrorCategory::BadRequest,
                    format!("Gemini blocked the prompt: {}", reason),
                    PROVIDER_NAME,
                )
                .into(),
                None => PathwayError::UpstreamUnavailable(
                    "Gemini returned no completion candidates".to_string(),
                ),
            });
        };

        Ok(candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_from_model() {
        let mut cfg = config();
        cfg.api_base = Some("http://localhost:8080/v1beta/".to_string());
        cfg.model = "gemini-2.5-flash".to_string();

        let provider = GeminiProvider::new(&cfg).unwrap();
        assert_eq!(
            provider.endpoint().as_str(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = GeminiProvider::new(&config()).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_request_json_mode_only_with_hint() {
        let provider = GeminiProvider::new(&config()).unwrap();

        let plain = serde_json::to_value(provider.build_request("hi", None)).unwrap();
        assert!(plain["generationConfig"].get("responseMimeType").is_none());
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");

        let json = serde_json::to_value(provider.build_request("hi", Some("{}"))).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_response_text_joined() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.into_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_blocked_response_not_retried() {
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        match body.into_text() {
            Err(err @ PathwayError::Llm(_)) => {
                assert!(err.to_string().contains("SAFETY"));
                assert!(!err.is_recoverable());
            }
            other => panic!("unexpected: {:?}", other),
        }

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        let err = empty.into_text().unwrap_err();
        assert!(matches!(err, PathwayError::UpstreamUnavailable(_)));
        assert!(err.is_recoverable());
    }
}
