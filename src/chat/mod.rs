//! Chat-style Pathway Editor
//!
//! Free-text requests such as "move module 3 to section 1" or "regenerate the
//! safety module with a casual tone" are parsed into a [`ChatIntent`] and
//! applied to the session's current pathway. Requests can also pull modules
//! and sections out of past pathways, add source files, or attach flashcards
//! and quizzes to a module.
//!
//! Module numbers are 1-based and counted across the whole pathway. Section and
//! position numbers are 1-based as well. Edits the model rejects (an emptied
//! section, an index out of range) come back as a reply explaining why nothing
//! changed, not as an error.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

use crate::ai::prompt::PromptTemplates;
use crate::ai::provider::CompletionClient;
use crate::ai::timeout::with_timeout;
use crate::assets::AssetGenerator;
use crate::constants::assets::{DEFAULT_FLASHCARD_COUNT, DEFAULT_QUIZ_QUESTIONS};
use crate::generation::{GenerationOptions, PathwayGenerator};
use crate::ingest;
use crate::pathway::{ModulePosition, Pathway};
use crate::session::Session;
use crate::types::{PathwayError, Result};

// =============================================================================
// Tone / Focus
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Professional,
    Casual,
    Technical,
    Simple,
    Authoritative,
}

impl Tone {
    const KEYWORDS: [(Tone, &'static [&'static str]); 5] = [
        (Tone::Professional, &["professional", "formal", "business"]),
        (Tone::Casual, &["casual", "informal", "friendly"]),
        (Tone::Technical, &["technical", "detailed", "comprehensive"]),
        (Tone::Simple, &["simple", "basic", "easy"]),
        (Tone::Authoritative, &["authoritative", "commanding", "strict"]),
    ];

    /// First tone whose keyword appears in `text`
    pub fn detect(text: &str) -> Option<Self> {
        detect(text, &Self::KEYWORDS)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Casual => "casual",
            Self::Technical => "technical",
            Self::Simple => "simple",
            Self::Authoritative => "authoritative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Safety,
    Quality,
    Procedure,
    Equipment,
    Maintenance,
}

impl Focus {
    const KEYWORDS: [(Focus, &'static [&'static str]); 5] = [
        (Focus::Safety, &["safety", "ppe", "protective", "hazard"]),
        (Focus::Quality, &["quality", "inspection", "standard"]),
        (Focus::Procedure, &["procedure", "process", "workflow"]),
        (Focus::Equipment, &["equipment", "tool", "machine"]),
        (Focus::Maintenance, &["maintenance", "repair", "service"]),
    ];

    pub fn detect(text: &str) -> Option<Self> {
        detect(text, &Self::KEYWORDS)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Quality => "quality",
            Self::Procedure => "procedure",
            Self::Equipment => "equipment",
            Self::Maintenance => "maintenance",
        }
    }
}

fn detect<T: Copy>(text: &str, table: &[(T, &[&str])]) -> Option<T> {
    let lower = text.to_lowercase();
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(value, _)| *value)
}

// =============================================================================
// Intents
// =============================================================================

/// How a request names a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleRef {
    /// 1-based number across the pathway
    Number(usize),
    /// Case-insensitive title substring
    Keyword(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    MoveToSection { module: usize, section: usize },
    MoveUp { module: usize },
    MoveDown { module: usize },
    ReorderTo { module: usize, position: usize },
    Regenerate {
        target: ModuleRef,
        tone: Option<Tone>,
        focus: Option<Focus>,
    },
    PastPathway(usize),
    /// Module `module` of past pathway `past`, appended to `section` (the last
    /// section when absent). All numbers 1-based.
    CopyFromPast {
        past: usize,
        module: usize,
        section: Option<usize>,
    },
    MergePastSection { past: usize, section: usize },
    /// Regenerate with these files added to the session's sources
    Ingest(Vec<PathBuf>),
    Flashcards { module: usize },
    Quiz { module: usize },
    Help,
    Unknown,
}

struct IntentPatterns {
    reorder: Regex,
    move_to_section: Regex,
    move_direction: Regex,
    regenerate_number: Regex,
    regenerate_keyword: Regex,
    copy_from_past: Regex,
    merge_past_section: Regex,
    past_pathway: Regex,
    ingest: Regex,
    flashcards: Regex,
    quiz: Regex,
    help: Regex,
}

impl IntentPatterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            reorder: Regex::new(r"(?i)^\s*(?:reorder|move)\s+module\s+(\d+)\s+to\s+position\s+(\d+)\s*$")?,
            move_to_section: Regex::new(r"(?i)^\s*move\s+module\s+(\d+)\s+(?:to|into)\s+section\s+(\d+)\s*$")?,
            move_direction: Regex::new(r"(?i)^\s*move\s+module\s+(\d+)\s+(up|down)\s*$")?,
            regenerate_number: Regex::new(r"(?i)\b(?:regenerate|rewrite|update)\s+module\s+(\d+)\b")?,
            regenerate_keyword: Regex::new(r"(?i)\b(?:regenerate|rewrite|update)\s+(?:the\s+)?(.+?)\s+module\b")?,
            copy_from_past: Regex::new(
                r"(?i)\bcopy\s+module\s+(\d+)\s+from\s+past\s+pathway\s+(\d+)(?:\s+(?:to|into)\s+section\s+(\d+))?\b",
            )?,
            merge_past_section: Regex::new(r"(?i)\bmerge\s+section\s+(\d+)\s+from\s+past\s+pathway\s+(\d+)\b")?,
            past_pathway: Regex::new(r"(?i)\bpast\s+pathway\s+(\d+)\b")?,
            ingest: Regex::new(r"(?i)^\s*(?:ingest|add\s+files?)\s+(.+)$")?,
            flashcards: Regex::new(r"(?i)\b(?:make|create|generate)\s+flashcards?\s+for\s+module\s+(\d+)\b")?,
            quiz: Regex::new(r"(?i)\b(?:make|create|generate)\s+(?:a\s+)?quiz\s+for\s+module\s+(\d+)\b")?,
            help: Regex::new(r"(?i)^\s*(?:help|\?)\s*$")?,
        })
    }
}

static PATTERNS: LazyLock<std::result::Result<IntentPatterns, regex::Error>> =
    LazyLock::new(IntentPatterns::compile);

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<usize> {
    caps.get(group)?.as_str().parse().ok()
}

impl ChatIntent {
    pub fn parse(input: &str) -> Result<Self> {
        let patterns = PATTERNS
            .as_ref()
            .map_err(|e| PathwayError::Config(format!("invalid chat pattern: {}", e)))?;

        if patterns.help.is_match(input) {
            return Ok(Self::Help);
        }

        if let Some(caps) = patterns.ingest.captures(input) {
            let paths: Vec<PathBuf> = caps[1].split_whitespace().map(PathBuf::from).collect();
            return Ok(Self::Ingest(paths));
        }

        if let Some(caps) = patterns.reorder.captures(input)
            && let (Some(module), Some(position)) = (number(&caps, 1), number(&caps, 2))
        {
            return Ok(Self::ReorderTo { module, position });
        }

        if let Some(caps) = patterns.move_to_section.captures(input)
            && let (Some(module), Some(section)) = (number(&caps, 1), number(&caps, 2))
        {
            return Ok(Self::MoveToSection { module, section });
        }

        if let Some(caps) = patterns.move_direction.captures(input)
            && let Some(module) = number(&caps, 1)
        {
            let up = caps[2].eq_ignore_ascii_case("up");
            return Ok(if up {
                Self::MoveUp { module }
            } else {
                Self::MoveDown { module }
            });
        }

        if let Some(caps) = patterns.copy_from_past.captures(input)
            && let (Some(module), Some(past)) = (number(&caps, 1), number(&caps, 2))
        {
            return Ok(Self::CopyFromPast {
                past,
                module,
                section: number(&caps, 3),
            });
        }

        if let Some(caps) = patterns.merge_past_section.captures(input)
            && let (Some(section), Some(past)) = (number(&caps, 1), number(&caps, 2))
        {
            return Ok(Self::MergePastSection { past, section });
        }

        if let Some(caps) = patterns.flashcards.captures(input)
            && let Some(module) = number(&caps, 1)
        {
            return Ok(Self::Flashcards { module });
        }

        if let Some(caps) = patterns.quiz.captures(input)
            && let Some(module) = number(&caps, 1)
        {
            return Ok(Self::Quiz { module });
        }

        let target = patterns
            .regenerate_number
            .captures(input)
            .and_then(|caps| number(&caps, 1))
            .map(ModuleRef::Number)
            .or_else(|| {
                patterns
                    .regenerate_keyword
                    .captures(input)
                    .map(|caps| ModuleRef::Keyword(caps[1].trim().to_string()))
            });

        if let Some(target) = target {
            return Ok(Self::Regenerate {
                target,
                tone: Tone::detect(input),
                focus: Focus::detect(input),
            });
        }

        if let Some(caps) = patterns.past_pathway.captures(input)
            && let Some(n) = number(&caps, 1)
        {
            return Ok(Self::PastPathway(n));
        }

        Ok(Self::Unknown)
    }
}

// =============================================================================
// Assistant
// =============================================================================

const HELP_TEXT: &str = "\
You can ask me to:
- move module 3 to section 1
- move module 2 up / move module 2 down
- reorder module 4 to position 1
- regenerate module 2 with a casual tone
- regenerate the safety module with a focus on equipment
- show past pathway 1
- copy module 2 from past pathway 1 into section 3
- merge section 1 from past pathway 2
- make flashcards for module 2 / make a quiz for module 2
- ingest notes.md checklist.txt";

const NO_PATHWAY: &str = "There is no pathway yet. Generate one first.";

/// Chat front end over one completion client.
///
/// The client is cloned into the pathway and asset generators, so it should be
/// cheap to clone (`SharedClient`, or an `Arc` around a concrete client).
pub struct ChatAssistant<C> {
    generator: PathwayGenerator<C>,
    assets: AssetGenerator<C>,
}

impl<C: CompletionClient + Clone> ChatAssistant<C> {
    pub fn new(client: C, options: GenerationOptions) -> Self {
        Self {
            assets: AssetGenerator::new(client.clone()),
            generator: PathwayGenerator::new(client, options),
        }
    }

    /// Generator used for full regenerations, also usable for the first pathway
    pub fn generator(&self) -> &PathwayGenerator<C> {
        &self.generator
    }

    /// Apply one chat request to the session and return the reply text.
    ///
    /// Only completion-service failures surface as errors.
    #[instrument(skip(self, session), fields(session = %session.id()))]
    pub async fn handle(&self, session: &mut Session, input: &str) -> Result<String> {
        let intent = ChatIntent::parse(input)?;
        debug!(?intent, "Parsed chat intent");

        let outcome = match intent {
            ChatIntent::Help => Ok(HELP_TEXT.to_string()),
            ChatIntent::Unknown => Ok(format!(
                "I didn't understand \"{}\". Type \"help\" for examples.",
                input.trim()
            )),
            ChatIntent::PastPathway(n) => describe_past(session, n),
            ChatIntent::Regenerate { target, tone, focus } => {
                self.regenerate(session, &target, tone, focus).await
            }
            ChatIntent::Ingest(paths) => self.ingest(session, &paths).await,
            ChatIntent::Flashcards { module } => self.flashcards(session, module).await,
            ChatIntent::Quiz { module } => self.quiz(session, module).await,
            ChatIntent::CopyFromPast { past, module, section } => {
                copy_from_past(session, past, module, section)
            }
            ChatIntent::MergePastSection { past, section } => merge_past_section(session, past, section),
            edit => match session.store.current_mut() {
                Some(pathway) => apply_edit(pathway, &edit),
                None => return Ok(NO_PATHWAY.to_string()),
            },
        };

        match outcome {
            Err(e) if e.is_rejected_edit() => {
                debug!(error = %e, "Chat edit rejected");
                Ok(format!("No changes made: {}", e))
            }
            other => other,
        }
    }

    async fn regenerate(
        &self,
        session: &mut Session,
        target: &ModuleRef,
        tone: Option<Tone>,
        focus: Option<Focus>,
    ) -> Result<String> {
        let Some(pathway) = session.store.current() else {
            return Ok(NO_PATHWAY.to_string());
        };

        let position = resolve(pathway, target)?;
        let Some(module) = pathway.module(position).cloned() else {
            return Err(PathwayError::out_of_range("module", position.module, pathway.module_count()));
        };

        let prompt = PromptTemplates::module_regeneration(
            &module,
            tone.map(|t| t.as_str()),
            focus.map(|f| f.as_str()),
            None,
        )
        .build();

        let content = with_timeout(
            self.generator.options().timeout,
            self.generator.client().complete(&prompt, None),
            "module regeneration",
        )
        .await?;

        if content.trim().is_empty() {
            return Err(PathwayError::EmptyResponse);
        }

        let Some(pathway) = session.store.current_mut() else {
            return Ok(NO_PATHWAY.to_string());
        };
        pathway.replace_module_content(position.section, position.module, content)?;

        info!(module = %module.title(), "Module regenerated");
        Ok(format!(
            "Regenerated \"{}\" with {} tone and {} focus.",
            module.title(),
            tone.map_or("default", |t| t.as_str()),
            focus.map_or("general", |f| f.as_str()),
        ))
    }

    async fn ingest(&self, session: &mut Session, paths: &[PathBuf]) -> Result<String> {
        let added = match ingest::load_all(paths, self.generator.options().extract_concurrency).await {
            Ok(added) => added,
            Err(PathwayError::Io(e)) => {
                warn!(error = %e, "Could not read files for chat ingest");
                return Ok(format!("No changes made: could not read files ({})", e));
            }
            Err(e) => return Err(e),
        };

        let count = added.len();
        let outcome = self.generator.ingest(session, added).await?;
        let name = session.store.current().map_or("", |p| p.name());

        info!(files = count, degraded = outcome.degraded, "Pathway regenerated with new files");
        Ok(format!(
            "Added {} file(s) and regenerated \"{}\" from {} source(s). The previous pathway is in history.",
            count,
            name,
            session.sources().len()
        ))
    }

    async fn flashcards(&self, session: &mut Session, module: usize) -> Result<String> {
        let Some(pathway) = session.store.current_mut() else {
            return Ok(NO_PATHWAY.to_string());
        };
        let position = resolve(pathway, &ModuleRef::Number(module))?;

        let added = self
            .assets
            .attach_flashcards(pathway, position, DEFAULT_FLASHCARD_COUNT)
            .await?;
        Ok(format!("Added {} flashcard(s) to module {}.", added, module))
    }

    async fn quiz(&self, session: &mut Session, module: usize) -> Result<String> {
        let Some(pathway) = session.store.current_mut() else {
            return Ok(NO_PATHWAY.to_string());
        };
        let position = resolve(pathway, &ModuleRef::Number(module))?;

        let added = self
            .assets
            .attach_quiz(pathway, position, DEFAULT_QUIZ_QUESTIONS)
            .await?;
        Ok(format!("Added a {}-question quiz to module {}.", added, module))
    }
}

fn resolve(pathway: &Pathway, target: &ModuleRef) -> Result<ModulePosition> {
    match target {
        ModuleRef::Number(n) => pathway
            .nth_module(*n)
            .ok_or_else(|| PathwayError::out_of_range("module", *n, pathway.module_count())),
        ModuleRef::Keyword(keyword) => pathway.find_module(keyword).ok_or_else(|| {
            PathwayError::structural(format!("no module title matches \"{}\"", keyword))
        }),
    }
}

fn apply_edit(pathway: &mut Pathway, intent: &ChatIntent) -> Result<String> {
    match *intent {
        ChatIntent::MoveToSection { module, section } => {
            let from = resolve(pathway, &ModuleRef::Number(module))?;
            let to_section = section
                .checked_sub(1)
                .ok_or_else(|| PathwayError::out_of_range("section", section, pathway.sections().len()))?;

            let moved = pathway.move_module(from.section, to_section, from.module)?;
            let title = pathway
                .section(moved.section)
                .map(|s| s.title().to_string())
                .unwrap_or_default();
            Ok(format!("Moved module {} to section {} ({}).", module, section, title))
        }
        ChatIntent::MoveUp { module } => {
            let pos = resolve(pathway, &ModuleRef::Number(module))?;
            if pos.module == 0 {
                return Ok(format!("Module {} is already first in its section.", module));
            }
            pathway.reorder_module(pos.section, pos.module, pos.module - 1)?;
            Ok(format!("Moved module {} up.", module))
        }
        ChatIntent::MoveDown { module } => {
            let pos = resolve(pathway, &ModuleRef::Number(module))?;
            let len = pathway.section(pos.section).map_or(0, |s| s.modules().len());
            if pos.module + 1 >= len {
                return Ok(format!("Module {} is already last in its section.", module));
            }
            pathway.reorder_module(pos.section, pos.module, pos.module + 1)?;
            Ok(format!("Moved module {} down.", module))
        }
        ChatIntent::ReorderTo { module, position } => {
            let pos = resolve(pathway, &ModuleRef::Number(module))?;
            let len = pathway.section(pos.section).map_or(0, |s| s.modules().len());
            let to = position
                .checked_sub(1)
                .ok_or_else(|| PathwayError::out_of_range("position", position, len))?;
            pathway.reorder_module(pos.section, pos.module, to)?;
            Ok(format!("Module {} is now at position {} in its section.", module, position))
        }
        _ => Ok(HELP_TEXT.to_string()),
    }
}

/// Past pathway by 1-based number
fn past_pathway(session: &Session, n: usize) -> Result<&Pathway> {
    let index = n
        .checked_sub(1)
        .ok_or_else(|| PathwayError::out_of_range("past pathway", n, session.store.history_len()))?;
    session.store.past(index)
}

fn describe_past(session: &Session, n: usize) -> Result<String> {
    let pathway = past_pathway(session, n)?;

    let sections: Vec<&str> = pathway.sections().iter().map(|s| s.title()).collect();
    Ok(format!(
        "Past pathway {}: \"{}\" with {} section(s) and {} module(s): {}",
        n,
        pathway.name(),
        sections.len(),
        pathway.module_count(),
        sections.join(", ")
    ))
}

fn copy_from_past(session: &mut Session, past: usize, module: usize, section: Option<usize>) -> Result<String> {
    let source = past_pathway(session, past)?;
    let copied = source
        .nth_module(module)
        .and_then(|pos| source.module(pos))
        .cloned()
        .ok_or_else(|| PathwayError::out_of_range("module", module, source.module_count()))?;

    let Some(pathway) = session.store.current_mut() else {
        return Ok(NO_PATHWAY.to_string());
    };

    let target = match section {
        Some(n) => n
            .checked_sub(1)
            .ok_or_else(|| PathwayError::out_of_range("section", n, pathway.sections().len()))?,
        None => pathway.sections().len().saturating_sub(1),
    };

    let title = copied.title().to_string();
    let position = pathway.append_module(target, copied)?;
    info!(past, module = %title, section = position.section, "Module copied from past pathway");
    Ok(format!(
        "Copied \"{}\" from past pathway {} into section {}.",
        title,
        past,
        position.section + 1
    ))
}

fn merge_past_section(session: &mut Session, past: usize, section: usize) -> Result<String> {
    let source = past_pathway(session, past)?;
    let incoming = section
        .checked_sub(1)
        .and_then(|idx| source.section(idx))
        .cloned()
        .ok_or_else(|| PathwayError::out_of_range("section", section, source.sections().len()))?;

    let Some(pathway) = session.store.current_mut() else {
        return Ok(NO_PATHWAY.to_string());
    };

    let title = incoming.title().to_string();
    let (index, added) = pathway.merge_section(incoming)?;
    info!(past, section = %title, added, "Section merged from past pathway");
    Ok(format!(
        "Merged \"{}\" from past pathway {} into section {} ({} module(s) added).",
        title,
        past,
        index + 1,
        added
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::ScriptedClient;
    use crate::types::TrainingContext;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const FORKLIFT: &str = r#"{"pathway_name":"Forklift v2","sections":[{"title":"Basics","modules":[{"title":"Batteries","content":"Charge overnight"}]}]}"#;

    fn session_with_pathway() -> Session {
        let mut session = Session::new(
            TrainingContext::new("Operators", "Safe lifting", "Logistics", "1 week"),
            5,
        );
        let pathway = Pathway::from_parsed(&json!({
            "pathway_name": "Forklift",
            "sections": [
                {"title": "Basics", "modules": [
                    {"title": "Safety Rules", "content": "Wear PPE"},
                    {"title": "Controls", "content": "Levers"}
                ]},
                {"title": "Operation", "modules": [{"title": "Lifting", "content": "Lift slowly"}]}
            ]
        }))
        .unwrap();
        session.store.replace(pathway);
        session
    }

    /// Session whose current pathway is a fresh draft and whose history holds
    /// the forklift pathway as past pathway 1
    fn session_with_history() -> Session {
        let mut session = session_with_pathway();
        let draft = Pathway::from_parsed(&json!({
            "pathway_name": "Draft",
            "sections": [
                {"title": "basics ", "modules": [{"title": "Intro", "content": "Welcome"}]},
                {"title": "Review", "modules": [{"title": "Recap", "content": "Summary"}]}
            ]
        }))
        .unwrap();
        session.store.replace(draft);
        session
    }

    fn titles(session: &Session, section: usize) -> Vec<String> {
        session.store.current().unwrap().sections()[section]
            .modules()
            .iter()
            .map(|m| m.title().to_string())
            .collect()
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            timeout: Duration::from_secs(5),
            max_chars_per_file: 1000,
            extract_concurrency: 2,
            extra_instructions: None,
        }
    }

    fn chat_with(client: ScriptedClient) -> ChatAssistant<Arc<ScriptedClient>> {
        ChatAssistant::new(Arc::new(client), options())
    }

    fn assistant(reply: &str) -> ChatAssistant<Arc<ScriptedClient>> {
        chat_with(ScriptedClient::replying(reply))
    }

    #[test]
    fn test_parse_intents() {
        assert_eq!(
            ChatIntent::parse("Move module 3 to section 1").unwrap(),
            ChatIntent::MoveToSection { module: 3, section: 1 }
        );
        assert_eq!(
            ChatIntent::parse("move module 2 UP").unwrap(),
            ChatIntent::MoveUp { module: 2 }
        );
        assert_eq!(
            ChatIntent::parse("reorder module 4 to position 1").unwrap(),
            ChatIntent::ReorderTo { module: 4, position: 1 }
        );
        assert_eq!(ChatIntent::parse("show me past pathway 2").unwrap(), ChatIntent::PastPathway(2));
        assert_eq!(ChatIntent::parse(" help ").unwrap(), ChatIntent::Help);
        assert_eq!(ChatIntent::parse("what's the weather").unwrap(), ChatIntent::Unknown);
    }

    #[test]
    fn test_parse_past_pathway_and_asset_intents() {
        assert_eq!(
            ChatIntent::parse("copy module 2 from past pathway 1 into section 3").unwrap(),
            ChatIntent::CopyFromPast { past: 1, module: 2, section: Some(3) }
        );
        assert_eq!(
            ChatIntent::parse("Copy module 4 from past pathway 2").unwrap(),
            ChatIntent::CopyFromPast { past: 2, module: 4, section: None }
        );
        assert_eq!(
            ChatIntent::parse("merge section 1 from past pathway 3").unwrap(),
            ChatIntent::MergePastSection { past: 3, section: 1 }
        );
        assert_eq!(
            ChatIntent::parse("ingest notes.md  sop.txt").unwrap(),
            ChatIntent::Ingest(vec![PathBuf::from("notes.md"), PathBuf::from("sop.txt")])
        );
        assert_eq!(
            ChatIntent::parse("make flashcards for module 2").unwrap(),
            ChatIntent::Flashcards { module: 2 }
        );
        assert_eq!(
            ChatIntent::parse("create a quiz for module 1").unwrap(),
            ChatIntent::Quiz { module: 1 }
        );
    }

    #[test]
    fn test_parse_regenerate_tone_and_focus() {
        assert_eq!(
            ChatIntent::parse("Regenerate module 2 with a more friendly tone").unwrap(),
            ChatIntent::Regenerate {
                target: ModuleRef::Number(2),
                tone: Some(Tone::Casual),
                focus: None,
            }
        );
        assert_eq!(
            ChatIntent::parse("update the lifting module, focus on equipment").unwrap(),
            ChatIntent::Regenerate {
                target: ModuleRef::Keyword("lifting".to_string()),
                tone: None,
                focus: Some(Focus::Equipment),
            }
        );
    }

    #[tokio::test]
    async fn test_move_to_section() {
        let mut session = session_with_pathway();
        let reply = assistant("").handle(&mut session, "move module 2 to section 2").await.unwrap();

        assert!(reply.contains("Operation"));
        assert_eq!(titles(&session, 0), vec!["Safety Rules"]);
        assert_eq!(titles(&session, 1), vec!["Lifting", "Controls"]);
    }

    #[tokio::test]
    async fn test_move_that_empties_section_is_noop_reply() {
        let mut session = session_with_pathway();
        let before = session.store.current().unwrap().clone();

        let reply = assistant("").handle(&mut session, "move module 3 to section 1").await.unwrap();

        assert!(reply.starts_with("No changes made"));
        assert_eq!(session.store.current().unwrap(), &before);
    }

    #[tokio::test]
    async fn test_out_of_range_is_noop_reply() {
        let mut session = session_with_pathway();
        let reply = assistant("").handle(&mut session, "move module 9 down").await.unwrap();
        assert!(reply.contains("out of range"));

        let reply = assistant("").handle(&mut session, "move module 1 up").await.unwrap();
        assert!(reply.contains("already first"));
    }

    #[tokio::test]
    async fn test_regenerate_by_keyword_replaces_content() {
        let mut session = session_with_pathway();
        let chat = assistant("Keep both hands on the controls.\n");

        let reply = chat
            .handle(&mut session, "regenerate the controls module in a simple tone")
            .await
            .unwrap();

        assert!(reply.contains("simple tone"));
        let pathway = session.store.current().unwrap();
        assert_eq!(
            pathway.sections()[0].modules()[1].content(),
            "Keep both hands on the controls.\n"
        );
        let prompt = chat.generator().client().last_prompt().unwrap();
        assert!(prompt.contains("Levers"));
        assert!(prompt.contains("simple"));
    }

    #[tokio::test]
    async fn test_regenerate_upstream_failure_propagates() {
        let mut session = session_with_pathway();
        let chat = chat_with(ScriptedClient::new(vec![Err(PathwayError::UpstreamUnavailable(
            "down".into(),
        ))]));

        let err = chat.handle(&mut session, "regenerate module 1").await.unwrap_err();
        assert!(matches!(err, PathwayError::UpstreamUnavailable(_)));
        assert_eq!(
            session.store.current().unwrap().sections()[0].modules()[0].content(),
            "Wear PPE"
        );
    }

    #[tokio::test]
    async fn test_past_pathway_and_empty_session() {
        let mut session = session_with_pathway();
        let reply = assistant("").handle(&mut session, "past pathway 1").await.unwrap();
        assert!(reply.starts_with("No changes made"));

        session.store.replace(Pathway::fallback("new draft"));
        let reply = assistant("").handle(&mut session, "past pathway 1").await.unwrap();
        assert!(reply.contains("\"Forklift\""));
        assert!(reply.contains("Basics, Operation"));

        session.store.clear();
        let reply = assistant("").handle(&mut session, "move module 1 down").await.unwrap();
        assert_eq!(reply, NO_PATHWAY);
    }

    #[tokio::test]
    async fn test_copy_module_from_past_pathway() {
        let mut session = session_with_history();
        let chat = assistant("");

        let reply = chat
            .handle(&mut session, "copy module 3 from past pathway 1")
            .await
            .unwrap();
        assert!(reply.contains("\"Lifting\""));
        assert_eq!(titles(&session, 1), vec!["Recap", "Lifting"]);

        chat.handle(&mut session, "copy module 2 from past pathway 1 into section 1")
            .await
            .unwrap();
        assert_eq!(titles(&session, 0), vec!["Intro", "Controls"]);
        assert_eq!(session.store.past(0).unwrap().module_count(), 3);

        let reply = chat
            .handle(&mut session, "copy module 7 from past pathway 1")
            .await
            .unwrap();
        assert!(reply.starts_with("No changes made"));
        assert_eq!(session.store.current().unwrap().module_count(), 4);
    }

    #[tokio::test]
    async fn test_merge_section_from_past_pathway() {
        let mut session = session_with_history();
        let chat = assistant("");

        let reply = chat
            .handle(&mut session, "merge section 1 from past pathway 1")
            .await
            .unwrap();
        assert!(reply.contains("2 module(s) added"));
        assert_eq!(titles(&session, 0), vec!["Intro", "Safety Rules", "Controls"]);

        let reply = chat
            .handle(&mut session, "merge section 2 from past pathway 1")
            .await
            .unwrap();
        assert!(reply.contains("into section 3"));
        assert_eq!(titles(&session, 2), vec!["Lifting"]);

        let reply = chat
            .handle(&mut session, "merge section 1 from past pathway 1")
            .await
            .unwrap();
        assert!(reply.contains("0 module(s) added"));
    }

    #[tokio::test]
    async fn test_ingest_regenerates_with_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "Batteries must be charged overnight.").unwrap();

        let mut session = session_with_pathway();
        let chat = assistant(FORKLIFT);

        let reply = chat
            .handle(&mut session, &format!("ingest {}", notes.display()))
            .await
            .unwrap();

        assert!(reply.contains("\"Forklift v2\""));
        assert_eq!(session.store.current().unwrap().name(), "Forklift v2");
        assert_eq!(session.store.past(0).unwrap().name(), "Forklift");
        assert_eq!(session.sources().len(), 1);
        let prompt = chat.generator().client().last_prompt().unwrap();
        assert!(prompt.contains("charged overnight"));
    }

    #[tokio::test]
    async fn test_ingest_missing_file_changes_nothing() {
        let mut session = session_with_pathway();
        let chat = assistant(FORKLIFT);

        let reply = chat
            .handle(&mut session, "ingest /nonexistent/pathwright/notes.md")
            .await
            .unwrap();

        assert!(reply.starts_with("No changes made"));
        assert_eq!(session.store.current().unwrap().name(), "Forklift");
        assert_eq!(chat.generator().client().call_count(), 0);
    }

    #[tokio::test]
    async fn test_flashcards_and_quiz_attach_to_module() {
        let mut session = session_with_pathway();
        let chat = chat_with(ScriptedClient::new(vec![
            Ok(r#"[{"front": "Lever?", "back": "Lift control"}]"#.to_string()),
            Ok(r#"{"questions": [{"question": "Raise forks?", "options": ["Pull", "Push"], "answer": "Pull"}]}"#
                .to_string()),
        ]));

        let reply = chat.handle(&mut session, "make flashcards for module 2").await.unwrap();
        assert!(reply.contains("1 flashcard"));

        let reply = chat.handle(&mut session, "make a quiz for module 2").await.unwrap();
        assert!(reply.contains("1-question quiz"));

        let module = &session.store.current().unwrap().sections()[0].modules()[1];
        assert_eq!(module.flashcards()[0].front, "Lever?");
        assert_eq!(module.quiz().len(), 1);
    }
}
