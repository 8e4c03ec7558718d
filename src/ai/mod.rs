//! AI Integration Layer
//!
//! Prompt assembly, the completion client, timeouts and recovery of
//! structured pathways from raw completion text.

pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use prompt::{PATHWAY_SCHEMA, PromptBuilder, PromptSection, PromptTemplates, build_pathway_prompt};
pub use provider::{
    CompletionClient, ErrorCategory, ErrorClassifier, GeminiProvider, LlmError, RetryConfig,
    RetryingClient, SharedClient, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{ParseAttempt, Recovery, RepairStrategy, ResponseRecoveryParser};
