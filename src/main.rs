use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pathwright::ExportFormat;
use pathwright::cli::commands::{chat::ChatOptions, generate::GenerateOptions};

/// Parse export format from string
fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse::<ExportFormat>()
        .map_err(|_| format!("Invalid format '{}'. Valid values: json, yaml, markdown", s))
}

#[derive(Parser)]
#[command(name = "pathwright")]
#[command(version, about = "AI-driven training pathway generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a pathway from a training context and source files
    Generate {
        #[arg(long, short, help = "Training context file (TOML or JSON)")]
        context: PathBuf,
        #[arg(help = "Source files to ground the pathway in")]
        files: Vec<PathBuf>,
        #[arg(short = 'f', long, default_value = "json", value_parser = parse_format, help = "Output format: json, yaml, markdown")]
        format: ExportFormat,
        #[arg(long, short, help = "Output file (default: stdout)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Model override")]
        model: Option<String>,
        #[arg(long, help = "Extra instructions appended to the prompt")]
        instructions: Option<String>,
        #[arg(long, help = "Show every parse attempt")]
        attempts: bool,
    },

    /// Recover a pathway from a saved completion ('-' reads stdin)
    Parse {
        input: PathBuf,
        #[arg(short = 'f', long, default_value = "json", value_parser = parse_format, help = "Output format: json, yaml, markdown")]
        format: ExportFormat,
        #[arg(long, short, help = "Output file (default: stdout)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Show every parse attempt")]
        attempts: bool,
    },

    /// Convert a saved pathway JSON file to another format
    Export {
        input: PathBuf,
        #[arg(short = 'f', long, default_value = "markdown", value_parser = parse_format, help = "Output format: json, yaml, markdown")]
        format: ExportFormat,
        #[arg(long, short, help = "Output file (default: stdout)")]
        output: Option<PathBuf>,
    },

    /// Generate a pathway, then edit it interactively
    Chat {
        #[arg(long, short, help = "Training context file (TOML or JSON)")]
        context: PathBuf,
        files: Vec<PathBuf>,
        #[arg(short = 'f', long, default_value = "json", value_parser = parse_format)]
        format: ExportFormat,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            context,
            files,
            format,
            output,
            model,
            instructions,
            attempts,
        } => {
            pathwright::cli::commands::generate::run(GenerateOptions {
                context,
                files,
                format,
                output,
                model,
                instructions,
                show_attempts: attempts,
                quiet: cli.quiet,
            })?;
        }
        Commands::Parse {
            input,
            format,
            output,
            attempts,
        } => {
            pathwright::cli::commands::parse::run(&input, format, output, attempts, cli.quiet)?;
        }
        Commands::Export {
            input,
            format,
            output,
        } => {
            pathwright::cli::commands::export::run(&input, format, output)?;
        }
        Commands::Chat {
            context,
            files,
            format,
            output,
        } => {
            pathwright::cli::commands::chat::run(ChatOptions {
                context,
                files,
                format,
                output,
            })?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                pathwright::cli::commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                pathwright::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                pathwright::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
