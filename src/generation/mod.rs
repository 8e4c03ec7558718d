//! Pathway Generation
//!
//! One generation request end to end: prompt assembly, a bounded completion
//! call, recovery parsing of the full response, then installation as the
//! session's current pathway.
//!
//! The client is expected to retry on its own (see `RetryingClient`); the
//! timeout here bounds the whole request including those retries.

use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::ai::prompt::{PATHWAY_SCHEMA, PromptTemplates};
use crate::ai::provider::CompletionClient;
use crate::ai::timeout::{TimeoutConfig, with_timeout};
use crate::ai::validation::{ParseAttempt, RepairStrategy, ResponseRecoveryParser};
use crate::config::Config;
use crate::ingest::SourceMaterial;
use crate::pathway::ModulePosition;
use crate::session::Session;
use crate::types::Result;

/// Per-request generation settings
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Whole completion request, retries included
    pub timeout: Duration,
    pub max_chars_per_file: usize,
    /// Extraction tasks in flight when files are added mid-session
    pub extract_concurrency: usize,
    pub extra_instructions: Option<String>,
}

impl GenerationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: TimeoutConfig::from_llm(&config.llm).completion,
            max_chars_per_file: config.ingest.max_chars_per_file,
            extract_concurrency: config.ingest.max_concurrency,
            extra_instructions: None,
        }
    }

    pub fn with_extra_instructions(mut self, extra: impl Into<String>) -> Self {
        self.extra_instructions = Some(extra.into());
        self
    }
}

/// What happened while producing the session's new current pathway
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub attempts: Vec<ParseAttempt>,
    pub strategy: RepairStrategy,
    pub degraded: bool,
    /// Module pairs with identical content
    pub duplicates: Vec<(ModulePosition, ModulePosition)>,
    /// History entries dropped to stay within the limit
    pub evicted: usize,
}

pub struct PathwayGenerator<C> {
    client: C,
    parser: ResponseRecoveryParser,
    options: GenerationOptions,
}

impl<C: CompletionClient> PathwayGenerator<C> {
    pub fn new(client: C, options: GenerationOptions) -> Self {
        Self {
            client,
            parser: ResponseRecoveryParser::new(),
            options,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Generate a pathway for the session's training context.
    ///
    /// `InvalidContext` is returned before any upstream call. On timeout the
    /// response is abandoned and the session is left unchanged. On success
    /// `sources` become the session's source material.
    #[instrument(skip(self, session, sources), fields(session = %session.id(), sources = sources.len()))]
    pub async fn generate(
        &self,
        session: &mut Session,
        sources: &[SourceMaterial],
    ) -> Result<GenerationOutcome> {
        let prompt = PromptTemplates::pathway_generation(
            session.context(),
            PATHWAY_SCHEMA,
            self.options.extra_instructions.as_deref(),
            sources,
            self.options.max_chars_per_file,
        )?
        .build();
        debug!(chars = prompt.len(), "Built generation prompt");

        let raw = with_timeout(
            self.options.timeout,
            self.client.complete(&prompt, Some(PATHWAY_SCHEMA)),
            "pathway generation",
        )
        .await?;

        let recovery = self.parser.parse(&raw)?;
        let strategy = recovery.strategy();
        let duplicates = recovery.pathway.duplicate_modules();

        if recovery.degraded {
            warn!("Completion could not be structured, kept as a single module");
        }
        if !duplicates.is_empty() {
            warn!(count = duplicates.len(), "Pathway contains modules with identical content");
        }

        info!(
            pathway = %recovery.pathway.name(),
            sections = recovery.pathway.sections().len(),
            modules = recovery.pathway.module_count(),
            strategy = %strategy,
            provider = self.client.name(),
            "Pathway generated"
        );

        let evicted = session.store.replace(recovery.pathway);
        session.set_sources(sources.to_vec());

        Ok(GenerationOutcome {
            attempts: recovery.attempts,
            strategy,
            degraded: recovery.degraded,
            duplicates,
            evicted,
        })
    }

    /// Regenerate with the session's existing sources plus `added`.
    ///
    /// The pathway being replaced moves to history like any other generation.
    pub async fn ingest(
        &self,
        session: &mut Session,
        added: Vec<SourceMaterial>,
    ) -> Result<GenerationOutcome> {
        let mut sources = session.sources().to_vec();
        sources.extend(added);
        self.generate(session, &sources).await
    }
}
