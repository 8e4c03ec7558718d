//! Chat Command
//!
//! Generates a pathway, then reads edit requests from stdin one line at a time.
//! `show` prints the current outline, `quit` ends the session and writes the
//! final pathway. `ingest <FILES..>` regenerates with extra source files.
//!
//! Usage:
//!   pathwright chat --context ctx.toml [FILES..] [-f json] [-o out.json]

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Runtime;

use crate::ai::provider::create_provider;
use crate::chat::ChatAssistant;
use crate::cli::{Output, load_context, load_sources, write_output};
use crate::config::ConfigLoader;
use crate::generation::GenerationOptions;
use crate::pathway::ExportFormat;
use crate::session::Session;
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub context: PathBuf,
    pub files: Vec<PathBuf>,
    pub format: ExportFormat,
    pub output: Option<PathBuf>,
}

pub fn run(options: ChatOptions) -> Result<()> {
    let rt = Runtime::new()?;
    rt.block_on(run_async(options))
}

async fn run_async(options: ChatOptions) -> Result<()> {
    let out = Output::new();
    let config = ConfigLoader::load()?;

    let context = load_context(&options.context)?;
    let sources = load_sources(&options.files, &config).await?;
    let client = create_provider(&config.llm)?;

    let mut session = Session::new(context, config.session.history_limit);
    let assistant = ChatAssistant::new(client, GenerationOptions::from_config(&config));
    assistant.generator().generate(&mut session, &sources).await?;

    if let Some(pathway) = session.store.current() {
        out.summary(pathway);
    }
    out.info("Type a request (\"help\" for examples, \"quit\" to finish)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => continue,
            "quit" | "exit" => break,
            "show" => {
                if let Some(pathway) = session.store.current() {
                    out.summary(pathway);
                }
            }
            _ => match assistant.handle(&mut session, input).await {
                Ok(reply) => eprintln!("{}", reply),
                Err(e) => out.error(&e.to_string()),
            },
        }
    }

    if let Some(pathway) = session.store.current() {
        write_output(&pathway.export(options.format)?, options.output.as_deref())?;
    }
    Ok(())
}
