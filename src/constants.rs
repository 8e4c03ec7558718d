//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Completion retry constants
pub mod retry {
    /// Default retries after the first failed completion call
    pub const DEFAULT_MAX_RETRIES: u8 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Recovery parser constants
pub mod recovery {
    /// Title used for the degraded single-section/single-module pathway
    pub const FALLBACK_TITLE: &str = "Generated Content";

    /// Pathway name used when the response carries none
    pub const FALLBACK_PATHWAY_NAME: &str = "Generated Pathway";

    /// Characters of candidate text kept in a ParseAttempt for diagnostics
    pub const ATTEMPT_PREVIEW_CHARS: usize = 2000;
}

/// Session constants
pub mod session {
    /// Past pathways kept for "reference past pathway" requests
    pub const DEFAULT_HISTORY_LIMIT: usize = 10;
}

/// Study asset constants
pub mod assets {
    /// Flashcards requested per module from chat
    pub const DEFAULT_FLASHCARD_COUNT: usize = 5;

    /// Quiz questions requested per module from chat
    pub const DEFAULT_QUIZ_QUESTIONS: usize = 5;
}

/// Prompt constants
pub mod prompt {
    /// Original module content kept in a regeneration prompt
    pub const REGENERATION_CONTENT_CHARS: usize = 1000;

    /// Default source material characters per file
    pub const DEFAULT_MAX_CHARS_PER_FILE: usize = 12_000;
}

/// File ingestion constants
pub mod ingest {
    /// Concurrent extraction tasks
    pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

    /// Maximum file size to ingest (20MB)
    pub const MAX_FILE_SIZE: usize = 20 * 1024 * 1024;
}

/// HTTP/Network constants
pub mod network {
    /// Default completion request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
