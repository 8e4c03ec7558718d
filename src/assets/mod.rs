//! Study Asset Generation
//!
//! Flashcards and multiple-choice quizzes for a single module. The completion
//! is parsed leniently with the same repair helpers as pathway responses; items
//! that fail validation are skipped rather than failing the batch.

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::ai::prompt::PromptTemplates;
use crate::ai::provider::CompletionClient;
use crate::ai::validation::json_repair;
use crate::pathway::{Flashcard, Module, ModulePosition, Pathway, QuizQuestion};
use crate::types::{PathwayError, Result};

const ARRAY_HINT: &str = "JSON array";

/// Keys a model may wrap the item array in
const WRAPPER_KEYS: &[&str] = &["flashcards", "cards", "quiz", "questions", "items"];

pub struct AssetGenerator<C> {
    client: C,
}

impl<C: CompletionClient> AssetGenerator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    #[instrument(skip(self, module), fields(module = %module.title()))]
    pub async fn flashcards(&self, module: &Module, count: usize) -> Result<Vec<Flashcard>> {
        let prompt = PromptTemplates::flashcards(module, count).build();
        let raw = self.client.complete(&prompt, Some(ARRAY_HINT)).await?;

        let cards: Vec<Flashcard> = items(&raw)?
            .iter()
            .filter_map(Flashcard::from_value)
            .take(count.max(1))
            .collect();

        if cards.is_empty() {
            return Err(PathwayError::structural("no valid flashcards in response"));
        }
        debug!(count = cards.len(), "Generated flashcards");
        Ok(cards)
    }

    #[instrument(skip(self, module), fields(module = %module.title()))]
    pub async fn quiz(&self, module: &Module, count: usize) -> Result<Vec<QuizQuestion>> {
        let prompt = PromptTemplates::quiz(module, count).build();
        let raw = self.client.complete(&prompt, Some(ARRAY_HINT)).await?;

        let values = items(&raw)?;
        let questions: Vec<QuizQuestion> = values
            .iter()
            .filter_map(QuizQuestion::from_value)
            .take(count.max(1))
            .collect();

        if questions.len() < values.len().min(count.max(1)) {
            warn!(
                received = values.len(),
                kept = questions.len(),
                "Skipped invalid quiz questions"
            );
        }

        if questions.is_empty() {
            return Err(PathwayError::structural("no valid quiz questions in response"));
        }
        Ok(questions)
    }

    /// Generate flashcards and store them on the module at `position`
    pub async fn attach_flashcards(
        &self,
        pathway: &mut Pathway,
        position: ModulePosition,
        count: usize,
    ) -> Result<usize> {
        let module = lookup(pathway, position)?;
        let cards = self.flashcards(module, count).await?;
        let added = cards.len();

        if let Some(target) = pathway.module_mut(position) {
            target.set_flashcards(cards);
        }
        Ok(added)
    }

    /// Generate a quiz and store it on the module at `position`
    pub async fn attach_quiz(
        &self,
        pathway: &mut Pathway,
        position: ModulePosition,
        count: usize,
    ) -> Result<usize> {
        let module = lookup(pathway, position)?;
        let questions = self.quiz(module, count).await?;
        let added = questions.len();

        if let Some(target) = pathway.module_mut(position) {
            target.set_quiz(questions);
        }
        Ok(added)
    }
}

fn lookup(pathway: &Pathway, position: ModulePosition) -> Result<&Module> {
    let section = pathway
        .section(position.section)
        .ok_or_else(|| PathwayError::out_of_range("section", position.section, pathway.sections().len()))?;
    section
        .module(position.module)
        .ok_or_else(|| PathwayError::out_of_range("module", position.module, section.modules().len()))
}

/// Item array from a completion: bare array or an object wrapping one
fn items(raw: &str) -> Result<Vec<Value>> {
    if raw.trim().is_empty() {
        return Err(PathwayError::EmptyResponse);
    }

    let value = json_repair::parse_lenient(raw)
        .ok_or_else(|| PathwayError::structural("asset response is not JSON"))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| PathwayError::structural("asset response holds no item array")),
        _ => Err(PathwayError::structural("asset response is not an array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::ScriptedClient;
    use serde_json::json;

    fn module() -> Module {
        Module::new("Pre-shift checks", "Inspect forks, chains and tyres before every shift.")
    }

    #[tokio::test]
    async fn test_flashcards_skips_invalid_items() {
        let client = ScriptedClient::replying(
            r#"```json
[{"front": "What is checked first?", "back": "The forks"},
 {"front": "", "back": "orphan"},
 {"front": "Tyres", "back": "Check pressure"}]
```"#,
        );
        let generator = AssetGenerator::new(client);

        let cards = generator.flashcards(&module(), 5).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].back, "The forks");
        assert!(generator.client.last_prompt().unwrap().contains("Pre-shift checks"));
    }

    #[tokio::test]
    async fn test_flashcards_truncated_response() {
        let client = ScriptedClient::replying(
            r#"[{"front": "Forks", "back": "Look for cracks"}, {"front": "Chains", "ba"#,
        );
        let cards = AssetGenerator::new(client).flashcards(&module(), 3).await.unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[tokio::test]
    async fn test_quiz_validates_answer_in_options() {
        let client = ScriptedClient::replying(
            &json!({"questions": [
                {"question": "When to inspect?", "options": ["Before shift", "Never"], "answer": "Before shift"},
                {"question": "Bad", "options": ["A", "B"], "answer": "C"},
                {"question": "One option", "options": ["A"], "answer": "A"}
            ]})
            .to_string(),
        );

        let quiz = AssetGenerator::new(client).quiz(&module(), 3).await.unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].answer, "Before shift");
    }

    #[tokio::test]
    async fn test_no_valid_items_is_structural_violation() {
        let client = ScriptedClient::replying("I cannot help with that.");
        let err = AssetGenerator::new(client).quiz(&module(), 3).await.unwrap_err();
        assert!(matches!(err, PathwayError::StructuralViolation(_)));

        let client = ScriptedClient::replying("   ");
        let err = AssetGenerator::new(client).flashcards(&module(), 3).await.unwrap_err();
        assert!(matches!(err, PathwayError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_attach_flashcards() {
        let mut pathway = Pathway::from_parsed(&json!({
            "pathway_name": "P",
            "sections": [{"title": "S", "modules": [{"title": "M", "content": "C"}]}]
        }))
        .unwrap();
        let client = ScriptedClient::replying(r#"[{"front": "F", "back": "B"}]"#);
        let generator = AssetGenerator::new(client);
        let position = ModulePosition { section: 0, module: 0 };

        let added = generator.attach_flashcards(&mut pathway, position, 1).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(pathway.module(position).unwrap().flashcards()[0].front, "F");

        let missing = ModulePosition { section: 0, module: 4 };
        assert!(matches!(
            generator.attach_quiz(&mut pathway, missing, 1).await,
            Err(PathwayError::IndexOutOfRange { what: "module", .. })
        ));
    }
}
