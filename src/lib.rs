//! Pathwright - AI-Driven Training Pathway Generator
//!
//! Turns a training context and uploaded source material into a structured
//! training pathway (sections of modules) using a generative completion
//! service, recovers usable structure from malformed completion text, and lets
//! a chat-style editor rearrange and regenerate the result.
//!
//! ## Core Features
//!
//! - **Response Recovery**: repair ladder for trailing data, decoration and
//!   truncation, with a verbatim fallback so no response is lost
//! - **Validated Model**: every section holds at least one module
//! - **Session History**: bounded, most-recent-first past pathways
//! - **Chat Editing**: move, reorder and regenerate modules from free text,
//!   reuse past pathways, add source files, attach flashcards and quizzes
//!
//! ## Quick Start
//!
//! ```ignore
//! use pathwright::{ConfigLoader, PathwayGenerator, GenerationOptions, Session, TrainingContext};
//! use pathwright::ai::create_provider;
//!
//! let config = ConfigLoader::load()?;
//! let client = create_provider(&config.llm)?;
//! let generator = PathwayGenerator::new(client, GenerationOptions::from_config(&config));
//!
//! let context = TrainingContext::new("New hires", "Safe forklift use", "Logistics", "2 weeks");
//! let mut session = Session::new(context, config.session.history_limit);
//! generator.generate(&mut session, &[]).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: prompts, completion client, timeouts, response recovery
//! - [`pathway`]: pathway model, edits and export
//! - [`session`]: current pathway and history
//! - [`chat`]: free-text edit requests
//! - [`ingest`]: source file text extraction

pub mod ai;
pub mod assets;
pub mod chat;
pub mod cli;
pub mod config;
pub mod constants;
pub mod generation;
pub mod ingest;
pub mod pathway;
pub mod session;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, PathwayError, Result};
pub use types::{SessionId, TrainingContext};

// Model
pub use pathway::{ExportFormat, Module, ModulePosition, Pathway, Section};
pub use session::{Session, SessionStore};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use ai::{
    CompletionClient, ParseAttempt, Recovery, RepairStrategy, ResponseRecoveryParser,
    SharedClient, TimeoutConfig, with_timeout,
};
pub use assets::AssetGenerator;
pub use chat::{ChatAssistant, ChatIntent};
pub use generation::{GenerationOptions, GenerationOutcome, PathwayGenerator};
pub use ingest::{PlainTextExtractor, SourceMaterial, TextExtractor};
