//! Interactive Session State
//!
//! Holds the current pathway and a bounded, most-recent-first history of the
//! pathways it replaced. A `Session` is passed explicitly to every operation;
//! there is no global state.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::debug;

use crate::constants::session::DEFAULT_HISTORY_LIMIT;
use crate::ingest::SourceMaterial;
use crate::pathway::Pathway;
use crate::types::{PathwayError, Result, SessionId, TrainingContext};

// =============================================================================
// Session Store
// =============================================================================

/// Current pathway plus bounded history
#[derive(Debug, Clone)]
pub struct SessionStore {
    current: Option<Pathway>,
    history: VecDeque<Pathway>,
    history_limit: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            current: None,
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
        }
    }

    pub fn current(&self) -> Option<&Pathway> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Pathway> {
        self.current.as_mut()
    }

    /// Install a new current pathway; the previous one moves to history.
    /// Returns how many history entries were evicted.
    pub fn replace(&mut self, pathway: Pathway) -> usize {
        let mut evicted = 0;

        if let Some(previous) = self.current.replace(pathway) {
            self.history.push_front(previous);
            while self.history.len() > self.history_limit {
                self.history.pop_back();
                evicted += 1;
            }
        }

        debug!(history = self.history.len(), evicted, "Current pathway replaced");
        evicted
    }

    /// Past pathways, most recent first
    pub fn history(&self) -> impl Iterator<Item = &Pathway> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Past pathway by 0-based index (0 = most recently replaced)
    pub fn past(&self, index: usize) -> Result<&Pathway> {
        self.history
            .get(index)
            .ok_or_else(|| PathwayError::out_of_range("past pathway", index, self.history.len()))
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.history.clear();
    }
}

// =============================================================================
// Session
// =============================================================================

/// Per-user context object passed to generation and chat operations
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    context: TrainingContext,
    /// Source material the current pathway was generated from
    sources: Vec<SourceMaterial>,
    pub store: SessionStore,
}

impl Session {
    pub fn new(context: TrainingContext, history_limit: usize) -> Self {
        Self {
            id: SessionId::generate(),
            created_at: Utc::now(),
            context,
            sources: Vec::new(),
            store: SessionStore::new(history_limit),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn context(&self) -> &TrainingContext {
        &self.context
    }

    /// Start over with a different training context; history is kept
    pub fn set_context(&mut self, context: TrainingContext) {
        self.context = context;
    }

    pub fn sources(&self) -> &[SourceMaterial] {
        &self.sources
    }

    pub(crate) fn set_sources(&mut self, sources: Vec<SourceMaterial>) {
        self.sources = sources;
    }
}
