//! Generate Command
//!
//! Usage:
//!   pathwright generate --context ctx.toml [FILES..] [-f markdown] [-o out.md]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::ai::provider::create_provider;
use crate::cli::{Output, load_context, load_sources, write_output};
use crate::config::ConfigLoader;
use crate::generation::{GenerationOptions, PathwayGenerator};
use crate::pathway::ExportFormat;
use crate::session::Session;
use crate::types::{PathwayError, Result};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub context: PathBuf,
    pub files: Vec<PathBuf>,
    pub format: ExportFormat,
    pub output: Option<PathBuf>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub show_attempts: bool,
    pub quiet: bool,
}

pub fn run(options: GenerateOptions) -> Result<()> {
    let rt = Runtime::new()?;
    rt.block_on(run_async(options))
}

async fn run_async(options: GenerateOptions) -> Result<()> {
    let out = Output::quiet(options.quiet);

    let mut config = ConfigLoader::load()?;
    if let Some(model) = options.model {
        config.llm.model = model;
    }

    let context = load_context(&options.context)?;
    let sources = load_sources(&options.files, &config).await?;
    let empty = sources.iter().filter(|s| s.is_empty()).count();
    if empty > 0 {
        out.warning(&format!("{} source file(s) produced no text", empty));
    }

    let client = create_provider(&config.llm)?;
    out.info(&format!(
        "Generating with {} ({})",
        client.name(),
        client.model()
    ));

    let mut gen_options = GenerationOptions::from_config(&config);
    if let Some(extra) = options.instructions {
        gen_options = gen_options.with_extra_instructions(extra);
    }

    let generator = PathwayGenerator::new(client, gen_options);
    let mut session = Session::new(context, config.session.history_limit);
    let outcome = generator.generate(&mut session, &sources).await?;

    if options.show_attempts {
        out.attempts(&outcome.attempts);
    }
    if outcome.degraded {
        out.warning("Response could not be structured; content kept as a single module");
    }
    for (first, second) in &outcome.duplicates {
        out.warning(&format!(
            "Modules {}.{} and {}.{} have identical content",
            first.section + 1,
            first.module + 1,
            second.section + 1,
            second.module + 1
        ));
    }

    let pathway = session
        .store
        .current()
        .ok_or_else(|| PathwayError::structural("no pathway after generation"))?;
    out.summary(pathway);

    write_output(&pathway.export(options.format)?, options.output.as_deref())?;
    if let Some(path) = &options.output {
        out.success(&format!("Wrote {} to {}", options.format, path.display()));
    }
    Ok(())
}
