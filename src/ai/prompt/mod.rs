//! Prompt Builder System
//!
//! Standardized prompt construction for completion requests.
//! Every prompt is assembled from ordered sections so the same inputs always
//! render the same text.
//!
//! ## Design Principles
//!
//! 1. **Role Definition**: Clear AI role for each task
//! 2. **Structured Objectives**: Numbered goals
//! 3. **Context Sections**: Training context in a fixed field order
//! 4. **Focus Enforcement**: Keep content on the stated goals
//! 5. **Anti-Patterns**: Explicit bad examples
//! 6. **Output Schema**: JSON structure definition

use crate::constants::prompt::REGENERATION_CONTENT_CHARS;
use crate::ingest::SourceMaterial;
use crate::pathway::Module;
use crate::types::{Result, TrainingContext};

/// JSON shape requested from the completion service for a pathway
pub const PATHWAY_SCHEMA: &str = r#"{
  "pathway_name": "Specific name tied to the training goals",
  "description": "One-sentence summary",
  "sections": [
    {
      "title": "Section title",
      "description": "What this section covers",
      "modules": [
        {
          "title": "Module title",
          "description": "Short description",
          "content": "Full training content for the module",
          "learning_objectives": ["Objective"],
          "key_points": ["Key point"]
        }
      ]
    }
  ]
}"#;

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Context key-value pairs, rendered in insertion order
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Fenced block with language tag
    Code { language: String, content: String },
    /// Focus enforcement with restrictions
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
    /// Anti-patterns with good/bad examples
    AntiPatterns { bad: Vec<String>, good: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Add a context item, appending to the existing context section if any
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let existing = self.sections.iter_mut().find_map(|section| match section {
            PromptSection::Context(items) => Some(items),
            _ => None,
        });

        match existing {
            Some(items) => items.push((key.to_string(), value.to_string())),
            None => self.sections.push(PromptSection::Context(vec![(
                key.to_string(),
                value.to_string(),
            )])),
        }
        self
    }

    /// Training context in fixed field order; optional fields only when set
    pub fn training_context(self, context: &TrainingContext) -> Self {
        let mut builder = self
            .context_item("Target Audience", context.audience.trim())
            .context_item("Primary Goals", context.goals.trim())
            .context_item("Industry", context.industry.trim())
            .context_item("Timeline", context.timeline.trim());

        if let Some(training_type) = &context.training_type {
            builder = builder.context_item("Training Type", training_type.trim());
        }
        if let Some(metrics) = &context.success_metrics {
            builder = builder.context_item("Success Metrics", metrics.trim());
        }
        builder
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add fenced block
    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add focus enforcement section
    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: Vec<&str>, good: Vec<&str>) -> Self {
        self.sections.push(PromptSection::AntiPatterns {
            bad: bad.into_iter().map(String::from).collect(),
            good: good.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Append extracted source files under a "Source Material" header.
    /// Files with no text are skipped; no section is added when all are empty.
    pub fn source_material(self, sources: &[SourceMaterial], max_chars_per_file: usize) -> Self {
        let rendered: Vec<String> = sources
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.render(max_chars_per_file))
            .collect();

        if rendered.is_empty() {
            return self;
        }
        self.section("Source Material", &rendered.join("\n\n"))
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Training Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("IMPORTANT: Focus EXCLUSIVELY on: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
                PromptSection::AntiPatterns { bad, good } => {
                    prompt.push_str("## ANTI-PATTERNS\n\n");
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("WRONG: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                    prompt.push_str("<what_to_do>\n");
                    for example in good {
                        prompt.push_str(&format!("CORRECT: {}\n", example));
                    }
                    prompt.push_str("</what_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Build the pathway generation prompt.
///
/// Fails with `InvalidContext` when any required context field is blank.
/// Deterministic: identical inputs produce identical text.
pub fn build_pathway_prompt(
    context: &TrainingContext,
    schema_description: &str,
    extra_instructions: Option<&str>,
) -> Result<String> {
    PromptTemplates::pathway_generation(context, schema_description, extra_instructions, &[], 0)
        .map(PromptBuilder::build)
}

/// Preset prompt templates for common use cases
pub struct PromptTemplates;

impl PromptTemplates {
    /// Template for full pathway generation
    pub fn pathway_generation(
        context: &TrainingContext,
        schema_description: &str,
        extra_instructions: Option<&str>,
        sources: &[SourceMaterial],
        max_chars_per_file: usize,
    ) -> Result<PromptBuilder> {
        context.validate()?;

        let mut builder = PromptBuilder::new()
            .role(
                "instructional designer",
                &format!("{} training programs", context.industry.trim()),
            )
            .objectives(vec![
                "Design a training pathway of sections, each holding one or more modules",
                "Write complete module content that advances the primary goals",
                "Use specific facts and procedures from the source material when provided",
                "Order sections so that foundations come before advanced topics",
            ])
            .training_context(context)
            .focus(
                context.goals.trim(),
                vec![
                    "Do NOT produce generic filler unrelated to the goals",
                    "Do NOT invent regulations or figures absent from the source material",
                    "Every module MUST have a non-empty title and content",
                ],
            )
            .anti_patterns(
                vec![
                    "\"content\": \"This module covers important topics.\"",
                    "A section with an empty \"modules\" array",
                ],
                vec![
                    "\"content\": \"Before each shift, inspect the forks for cracks and...\"",
                    "Each section lists at least one fully written module",
                ],
            )
            .section("Output Format", "Respond with JSON only, matching this structure:")
            .code("json", schema_description);

        if let Some(extra) = extra_instructions.map(str::trim).filter(|e| !e.is_empty()) {
            builder = builder.section("Additional Instructions", extra);
        }

        Ok(builder.source_material(sources, max_chars_per_file))
    }

    /// Template for rewriting one module's content
    pub fn module_regeneration(
        module: &Module,
        tone: Option<&str>,
        focus: Option<&str>,
        changes: Option<&str>,
    ) -> PromptBuilder {
        let original: String = module.content().chars().take(REGENERATION_CONTENT_CHARS).collect();

        PromptBuilder::new()
            .role("training content editor", "revising course modules")
            .objectives(vec![
                "Regenerate the module content below",
                "Keep the key information while applying the requested tone and focus",
                "Return only the new module content as plain text",
            ])
            .context_item("Module", module.title())
            .context_item("Tone", tone.unwrap_or("professional"))
            .context_item("Focus", focus.unwrap_or("general"))
            .context_item("Changes", changes.unwrap_or("none"))
            .section("Original Content", &original)
    }

    /// Template for flashcard generation
    pub fn flashcards(module: &Module, count: usize) -> PromptBuilder {
        let goal = format!("Write {} flashcards covering the module's key concepts", count);

        PromptBuilder::new()
            .role("training content designer", "study aids")
            .objectives(vec![
                goal.as_str(),
                "Each card has a short question or term on the front and the answer on the back",
            ])
            .context_item("Module", module.title())
            .section("Module Content", module.content())
            .section("Output Format", "Respond with a JSON array only:")
            .code("json", r#"[{"front": "Question or term", "back": "Answer"}]"#)
    }

    /// Template for multiple-choice quiz generation
    pub fn quiz(module: &Module, count: usize) -> PromptBuilder {
        let goal = format!("Write {} multiple-choice questions about the module", count);

        PromptBuilder::new()
            .role("assessment designer", "knowledge checks")
            .objectives(vec![
                goal.as_str(),
                "Give 3-4 options per question; the answer must be one of the options verbatim",
            ])
            .context_item("Module", module.title())
            .section("Module Content", module.content())
            .section("Output Format", "Respond with a JSON array only:")
            .code(
                "json",
                r#"[{"question": "...", "options": ["A", "B", "C"], "answer": "A"}]"#,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PathwayError;

    fn context() -> TrainingContext {
        TrainingContext::new(
            "New warehouse staff",
            "Safe forklift operation",
            "Logistics",
            "2 weeks",
        )
    }

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("instructional designer", "onboarding")
            .objectives(vec!["Outline modules", "Write content"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("instructional designer"));
        assert!(prompt.contains("1. Outline modules"));
        assert!(prompt.contains("2. Write content"));
    }

    #[test]
    fn test_context_items_keep_order() {
        let prompt = PromptBuilder::new()
            .context_item("Zeta", "last")
            .context_item("Alpha", "first")
            .build();

        let zeta = prompt.find("**Zeta**: last").unwrap();
        let alpha = prompt.find("**Alpha**: first").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn test_pathway_prompt_is_deterministic() {
        let a = build_pathway_prompt(&context(), PATHWAY_SCHEMA, Some("Use UK spelling")).unwrap();
        let b = build_pathway_prompt(&context(), PATHWAY_SCHEMA, Some("Use UK spelling")).unwrap();

        assert_eq!(a, b);
        assert!(a.contains("**Target Audience**: New warehouse staff"));
        assert!(a.contains("# Additional Instructions"));
        assert!(a.contains("\"pathway_name\""));
    }

    #[test]
    fn test_pathway_prompt_rejects_blank_context() {
        let mut ctx = context();
        ctx.timeline = "   ".to_string();

        let err = build_pathway_prompt(&ctx, PATHWAY_SCHEMA, None).unwrap_err();
        assert!(matches!(err, PathwayError::InvalidContext(_)));
    }

    #[test]
    fn test_optional_context_fields() {
        let ctx = context().with_success_metrics("Zero incidents");
        let prompt = build_pathway_prompt(&ctx, PATHWAY_SCHEMA, None).unwrap();

        assert!(prompt.contains("**Success Metrics**: Zero incidents"));
        assert!(!prompt.contains("Training Type"));
        assert!(!prompt.contains("Additional Instructions"));
    }

    #[test]
    fn test_source_material_truncated() {
        let sources = vec![
            SourceMaterial::new("manual.txt", "x".repeat(50)),
            SourceMaterial::new("empty.txt", ""),
        ];
        let prompt = PromptTemplates::pathway_generation(&context(), PATHWAY_SCHEMA, None, &sources, 10)
            .unwrap()
            .build();

        assert!(prompt.contains("# Source Material"));
        assert!(prompt.contains("manual.txt"));
        assert!(!prompt.contains("empty.txt"));
        assert!(!prompt.contains(&"x".repeat(11)));
    }

    #[test]
    fn test_module_regeneration_truncates_content() {
        let module = Module::new("Load limits", "y".repeat(REGENERATION_CONTENT_CHARS + 500));
        let prompt = PromptTemplates::module_regeneration(&module, Some("casual"), None, None).build();

        assert!(prompt.contains("**Tone**: casual"));
        assert!(prompt.contains("**Focus**: general"));
        assert!(prompt.contains(&"y".repeat(REGENERATION_CONTENT_CHARS)));
        assert!(!prompt.contains(&"y".repeat(REGENERATION_CONTENT_CHARS + 1)));
    }

    #[test]
    fn test_asset_templates() {
        let module = Module::new("PPE", "Wear gloves");
        let flashcards = PromptTemplates::flashcards(&module, 5).build();
        let quiz = PromptTemplates::quiz(&module, 3).build();

        assert!(flashcards.contains("Write 5 flashcards"));
        assert!(flashcards.contains("```json"));
        assert!(quiz.contains("Write 3 multiple-choice questions"));
    }
}
