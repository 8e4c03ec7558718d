//! Pathway Model
//!
//! Validated in-memory representation of a generated training pathway:
//! Pathway → Sections → Modules. Construction from loosely-typed completion
//! output goes through [`Pathway::from_parsed`]; once a `Pathway` exists every
//! section holds at least one module and every title is non-empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::constants::recovery::{FALLBACK_PATHWAY_NAME, FALLBACK_TITLE};
use crate::types::{PathwayError, Result};

// =============================================================================
// Assets
// =============================================================================

/// Front/back study card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

impl Flashcard {
    /// Both sides must be non-empty
    pub fn from_value(value: &Value) -> Option<Self> {
        let front = non_empty_str(value, &["front", "question", "term"])?;
        let back = non_empty_str(value, &["back", "answer", "definition"])?;
        Some(Self { front, back })
    }
}

/// Multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl QuizQuestion {
    /// Requires at least two options and an answer that is one of them
    pub fn from_value(value: &Value) -> Option<Self> {
        let question = non_empty_str(value, &["question", "prompt"])?;
        let options = string_array(value, &["options", "choices"]);
        let answer = non_empty_str(value, &["answer", "correct_answer"])?;

        if options.len() < 2 || !options.iter().any(|o| o == &answer) {
            return None;
        }

        Some(Self {
            question,
            options,
            answer,
        })
    }
}

/// Reference to a rendered training video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl VideoRef {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) if !url.trim().is_empty() => Some(Self {
                url: url.trim().to_string(),
                provider: None,
            }),
            Value::Object(_) => Some(Self {
                url: non_empty_str(value, &["url", "video_url"])?,
                provider: non_empty_str(value, &["provider"]),
            }),
            _ => None,
        }
    }
}

// =============================================================================
// Module
// =============================================================================

/// A single unit of training content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    title: String,
    #[serde(default)]
    description: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    learning_objectives: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flashcards: Vec<Flashcard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    quiz: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video: Option<VideoRef>,
}

impl Module {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            content: content.into(),
            learning_objectives: Vec::new(),
            key_points: Vec::new(),
            flashcards: Vec::new(),
            quiz: Vec::new(),
            video: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn learning_objectives(&self) -> &[String] {
        &self.learning_objectives
    }

    pub fn key_points(&self) -> &[String] {
        &self.key_points
    }

    pub fn flashcards(&self) -> &[Flashcard] {
        &self.flashcards
    }

    pub fn quiz(&self) -> &[QuizQuestion] {
        &self.quiz
    }

    pub fn video(&self) -> Option<&VideoRef> {
        self.video.as_ref()
    }

    /// Swap in new content, returning the previous text
    pub(crate) fn set_content(&mut self, content: String) -> String {
        std::mem::replace(&mut self.content, content)
    }

    pub(crate) fn set_flashcards(&mut self, cards: Vec<Flashcard>) {
        self.flashcards = cards;
    }

    pub(crate) fn set_quiz(&mut self, questions: Vec<QuizQuestion>) {
        self.quiz = questions;
    }

    /// Title must be non-empty after trimming
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PathwayError::structural("module title is empty"));
        }
        Ok(())
    }

    /// Build a module from one element of a `modules` array.
    ///
    /// `title` and `content` are required; a module missing either is rejected
    /// rather than filled in. Text is kept exactly as received.
    pub fn from_value(value: &Value, location: &str) -> Result<Self> {
        if !value.is_object() {
            return Err(PathwayError::structural(format!(
                "{} is not an object",
                location
            )));
        }

        let title = non_empty_str(value, &["title", "name"]).ok_or_else(|| {
            PathwayError::structural(format!("{} is missing a non-empty title", location))
        })?;

        let content = value
            .get("content")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                PathwayError::structural(format!("{} ('{}') is missing content", location, title))
            })?;

        Ok(Self {
            title,
            description: opt_str(value, "description"),
            content,
            learning_objectives: string_array(value, &["learning_objectives"]),
            key_points: string_array(value, &["key_points"]),
            flashcards: object_array(value, "flashcards", Flashcard::from_value),
            quiz: object_array(value, "quiz", QuizQuestion::from_value),
            video: value.get("video").and_then(VideoRef::from_value),
        })
    }

    /// Content fingerprint used to spot duplicated modules
    pub fn fingerprint(&self) -> String {
        let normalized: String = self
            .content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// =============================================================================
// Section
// =============================================================================

/// Top-level grouping within a pathway (a week, a phase)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    title: String,
    description: String,
    modules: Vec<Module>,
}

impl Section {
    /// A section always starts with one module
    pub fn new(title: impl Into<String>, first: Module) -> Result<Self> {
        let section = Self {
            title: title.into(),
            description: String::new(),
            modules: vec![first],
        };
        section.validate()?;
        Ok(section)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub(crate) fn modules_mut(&mut self) -> &mut Vec<Module> {
        &mut self.modules
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PathwayError::structural("section title is empty"));
        }
        if self.modules.is_empty() {
            return Err(PathwayError::structural(format!(
                "section '{}' has no modules",
                self.title
            )));
        }
        self.modules.iter().try_for_each(Module::validate)
    }

    fn from_value(value: &Value, idx: usize) -> Result<Self> {
        let location = format!("sections[{}]", idx);

        if !value.is_object() {
            return Err(PathwayError::structural(format!(
                "{} is not an object",
                location
            )));
        }

        let title = non_empty_str(value, &["title", "name", "section_name"]).ok_or_else(|| {
            PathwayError::structural(format!("{} is missing a non-empty title", location))
        })?;

        let modules = match value.get("modules") {
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .enumerate()
                .map(|(m_idx, m)| Module::from_value(m, &format!("{}.modules[{}]", location, m_idx)))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(PathwayError::structural(format!(
                    "{} ('{}') has no modules",
                    location, title
                )));
            }
        };

        Ok(Self {
            title,
            description: opt_str(value, "description"),
            modules,
        })
    }
}

// =============================================================================
// Pathway
// =============================================================================

/// Position of a module inside a pathway (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulePosition {
    pub section: usize,
    pub module: usize,
}

/// Generated training curriculum (root entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pathway {
    #[serde(rename = "pathway_name")]
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    sections: Vec<Section>,
}

/// Which document inside a parsed response holds the pathway
#[derive(Debug)]
pub struct SelectedDocument<'a> {
    pub value: &'a Value,
    /// Additional pathways present in a `{"pathways": [...]}` wrapper and ignored
    pub ignored_pathways: usize,
}

impl Pathway {
    /// Build a pathway from already-validated sections
    pub fn new(name: impl Into<String>, sections: Vec<Section>) -> Result<Self> {
        let pathway = Self {
            name: name.into(),
            description: String::new(),
            sections,
        };
        pathway.validate()?;
        Ok(pathway)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validating constructor for loosely-typed completion output.
    ///
    /// Accepts a bare pathway object, a `{"pathways": [...]}` wrapper (first
    /// pathway wins) or a top-level array of sections. Fails with
    /// `StructuralViolation` when no section exists, a section lacks modules,
    /// or a title/content field is missing.
    pub fn from_parsed(data: &Value) -> Result<Self> {
        let selected = Self::select_document(data)?;
        let doc = selected.value;

        let (name, description, sections_value) = match doc {
            Value::Array(_) => (None, String::new(), Some(doc)),
            Value::Object(_) => (
                non_empty_str(doc, &["pathway_name", "name", "title"]),
                opt_str(doc, "description"),
                doc.get("sections"),
            ),
            _ => {
                return Err(PathwayError::structural(
                    "response is not a JSON object or array",
                ));
            }
        };

        let sections = match sections_value {
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .enumerate()
                .map(|(idx, s)| Section::from_value(s, idx))
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(PathwayError::structural("pathway has no sections")),
        };

        Ok(Self {
            name: name.unwrap_or_else(|| FALLBACK_PATHWAY_NAME.to_string()),
            description,
            sections,
        })
    }

    /// Locate the pathway document inside a parsed response
    pub fn select_document(data: &Value) -> Result<SelectedDocument<'_>> {
        match data.get("pathways") {
            Some(Value::Array(pathways)) => match pathways.first() {
                Some(first) => Ok(SelectedDocument {
                    value: first,
                    ignored_pathways: pathways.len() - 1,
                }),
                None => Err(PathwayError::structural("'pathways' array is empty")),
            },
            Some(_) => Err(PathwayError::structural("'pathways' must be an array")),
            None => Ok(SelectedDocument {
                value: data,
                ignored_pathways: 0,
            }),
        }
    }

    /// Degraded single-section/single-module pathway holding `raw` verbatim
    pub fn fallback(raw: &str) -> Self {
        Self {
            name: FALLBACK_PATHWAY_NAME.to_string(),
            description: String::new(),
            sections: vec![Section {
                title: FALLBACK_TITLE.to_string(),
                description: String::new(),
                modules: vec![Module::new(FALLBACK_TITLE, raw)],
            }],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(PathwayError::structural("pathway has no sections"));
        }
        self.sections.iter().try_for_each(Section::validate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub(crate) fn sections_mut(&mut self) -> &mut Vec<Section> {
        &mut self.sections
    }

    pub fn module(&self, position: ModulePosition) -> Option<&Module> {
        self.sections
            .get(position.section)
            .and_then(|s| s.modules.get(position.module))
    }

    pub(crate) fn module_mut(&mut self, position: ModulePosition) -> Option<&mut Module> {
        self.sections
            .get_mut(position.section)
            .and_then(|s| s.modules.get_mut(position.module))
    }

    pub fn module_count(&self) -> usize {
        self.sections.iter().map(|s| s.modules.len()).sum()
    }

    /// All modules in display order with their positions
    pub fn iter_modules(&self) -> impl Iterator<Item = (ModulePosition, &Module)> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(s_idx, section)| {
                section.modules.iter().enumerate().map(move |(m_idx, m)| {
                    (
                        ModulePosition {
                            section: s_idx,
                            module: m_idx,
                        },
                        m,
                    )
                })
            })
    }

    /// Module by 1-based number counted across the whole pathway
    pub fn nth_module(&self, number: usize) -> Option<ModulePosition> {
        number
            .checked_sub(1)
            .and_then(|idx| self.iter_modules().nth(idx))
            .map(|(pos, _)| pos)
    }

    /// "module N" (1-based, across sections), otherwise the first module whose
    /// title contains `keyword` (case-insensitive)
    pub fn find_module(&self, keyword: &str) -> Option<ModulePosition> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(number) = needle
            .strip_prefix("module")
            .and_then(|rest| rest.trim().parse::<usize>().ok())
        {
            return self.nth_module(number);
        }

        self.iter_modules()
            .find(|(_, m)| m.title.to_lowercase().contains(&needle))
            .map(|(pos, _)| pos)
    }

    /// Pairs of modules with identical content fingerprints
    pub fn duplicate_modules(&self) -> Vec<(ModulePosition, ModulePosition)> {
        let mut seen: Vec<(String, ModulePosition)> = Vec::new();
        let mut duplicates = Vec::new();

        for (pos, module) in self.iter_modules() {
            let fingerprint = module.fingerprint();
            match seen.iter().find(|(fp, _)| *fp == fingerprint) {
                Some((_, first)) => duplicates.push((*first, pos)),
                None => seen.push((fingerprint, pos)),
            }
        }

        duplicates
    }
}

// =============================================================================
// JSON helpers
// =============================================================================

/// First of `keys` holding a non-blank string, returned verbatim
fn non_empty_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(String::from)
}

fn opt_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_default()
}

fn string_array(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn object_array<T>(value: &Value, key: &str, map: fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(map).collect())
        .unwrap_or_default()
}
