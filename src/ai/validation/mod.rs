//! Completion Response Recovery
//!
//! Turns raw completion text into a validated `Pathway`, tolerating the ways
//! generative output goes wrong:
//! - Extra data after the document
//! - Markdown fences, comments and surrounding prose
//! - Output cut off mid-document
//!
//! ## Design Philosophy
//! - Malformed text is repaired, never reported as an error
//! - Structural violations send the ladder to the next rung
//! - A verbatim fallback keeps every non-empty response usable

pub mod json_repair;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::recovery::ATTEMPT_PREVIEW_CHARS;
use crate::pathway::Pathway;
use crate::types::{PathwayError, Result};

// =============================================================================
// Parse Attempts
// =============================================================================

/// One rung of the repair ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    Direct,
    TruncateTrailing,
    StripDecoration,
    BalanceDelimiters,
    Fallback,
}

impl RepairStrategy {
    /// Text strategies in the order they are tried; `Fallback` is last
    pub const LADDER: [RepairStrategy; 4] = [
        Self::Direct,
        Self::TruncateTrailing,
        Self::StripDecoration,
        Self::BalanceDelimiters,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::TruncateTrailing => "truncate_trailing",
            Self::StripDecoration => "strip_decoration",
            Self::BalanceDelimiters => "balance_delimiters",
            Self::Fallback => "fallback",
        }
    }

    /// Candidate texts this strategy produces (empty when it does not apply)
    fn candidates(&self, raw: &str) -> Vec<String> {
        match self {
            Self::Direct => json_repair::direct(raw).into_iter().collect(),
            Self::TruncateTrailing => json_repair::truncate_trailing(raw).into_iter().collect(),
            Self::StripDecoration => json_repair::strip_decoration(raw).into_iter().collect(),
            Self::BalanceDelimiters => json_repair::balance_candidates(raw),
            Self::Fallback => Vec::new(),
        }
    }
}

impl std::fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Diagnostic record of one strategy application
#[derive(Debug, Clone, Serialize)]
pub struct ParseAttempt {
    pub strategy: RepairStrategy,
    /// Candidate text the strategy produced (preview-truncated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ParseAttempt {
    fn not_applicable(strategy: RepairStrategy) -> Self {
        Self {
            strategy,
            text: None,
            success: false,
            note: Some("not applicable".to_string()),
        }
    }
}

/// Result of recovering a pathway from completion text
#[derive(Debug, Clone)]
pub struct Recovery {
    pub pathway: Pathway,
    pub attempts: Vec<ParseAttempt>,
    /// True when the verbatim fallback was used
    pub degraded: bool,
}

impl Recovery {
    /// Strategy that produced the pathway
    pub fn strategy(&self) -> RepairStrategy {
        self.attempts
            .iter()
            .rev()
            .find(|a| a.success)
            .map(|a| a.strategy)
            .unwrap_or(RepairStrategy::Fallback)
    }
}

// =============================================================================
// Recovery Parser
// =============================================================================

/// Runs the repair ladder over raw completion text
#[derive(Debug, Default, Clone)]
pub struct ResponseRecoveryParser;

impl ResponseRecoveryParser {
    pub fn new() -> Self {
        Self
    }

    /// Recover a pathway from raw completion text.
    ///
    /// Fails only with `EmptyResponse` when the text is blank; any other input
    /// yields a pathway, degraded to a single verbatim module when no rung
    /// succeeds.
    pub fn parse(&self, raw_text: &str) -> Result<Recovery> {
        if raw_text.trim().is_empty() {
            return Err(PathwayError::EmptyResponse);
        }

        let mut attempts = Vec::new();

        for strategy in RepairStrategy::LADDER {
            let candidates = strategy.candidates(raw_text);
            if candidates.is_empty() {
                debug!(strategy = %strategy, "Repair strategy not applicable");
                attempts.push(ParseAttempt::not_applicable(strategy));
                continue;
            }

            for candidate in candidates {
                let outcome = evaluate(&candidate);
                let success = outcome.is_ok();
                let mut notes = Vec::new();

                if strategy == RepairStrategy::TruncateTrailing {
                    notes.push(trailing_note(raw_text, &candidate));
                }

                let pathway = match outcome {
                    Ok((pathway, note)) => {
                        notes.extend(note);
                        Some(pathway)
                    }
                    Err(reason) => {
                        notes.push(reason);
                        None
                    }
                };

                debug!(strategy = %strategy, success, "Repair attempt");
                attempts.push(ParseAttempt {
                    strategy,
                    text: Some(preview(&candidate)),
                    success,
                    note: (!notes.is_empty()).then(|| notes.join("; ")),
                });

                if let Some(pathway) = pathway {
                    return Ok(Recovery {
                        pathway,
                        attempts,
                        degraded: false,
                    });
                }
            }
        }

        warn!(
            attempts = attempts.len(),
            "No repair strategy produced a valid pathway, using verbatim fallback"
        );
        attempts.push(ParseAttempt {
            strategy: RepairStrategy::Fallback,
            text: None,
            success: true,
            note: Some("raw text kept verbatim as a single module".to_string()),
        });

        Ok(Recovery {
            pathway: Pathway::fallback(raw_text),
            attempts,
            degraded: true,
        })
    }
}

/// Parse and validate one candidate
fn evaluate(candidate: &str) -> std::result::Result<(Pathway, Option<String>), String> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| format!("invalid JSON: {}", e))?;

    let ignored = Pathway::select_document(&value)
        .map(|doc| doc.ignored_pathways)
        .unwrap_or(0);

    let pathway = Pathway::from_parsed(&value).map_err(|e| e.to_string())?;

    let note = (ignored > 0).then(|| {
        format!(
            "used first of {} pathways; {} ignored",
            ignored + 1,
            ignored
        )
    });
    Ok((pathway, note))
}

fn trailing_note(raw_text: &str, candidate: &str) -> String {
    let rest = raw_text.trim_start().get(candidate.len()..).unwrap_or_default();
    let documents = json_repair::count_documents(rest);

    if documents > 0 {
        format!(
            "kept first document; ignored {} further document(s) in {} trailing bytes",
            documents,
            rest.len()
        )
    } else {
        format!("kept first document; ignored {} trailing bytes", rest.len())
    }
}

fn preview(text: &str) -> String {
    text.chars().take(ATTEMPT_PREVIEW_CHARS).collect()
}
