//! Parse Command
//!
//! Runs the recovery parser over a saved completion, for diagnosing responses
//! offline.
//!
//! Usage:
//!   pathwright parse raw.txt [-f yaml] [--attempts]
//!   cat raw.txt | pathwright parse -

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::ai::validation::ResponseRecoveryParser;
use crate::cli::{Output, write_output};
use crate::pathway::ExportFormat;
use crate::types::Result;

pub fn run(
    input: &Path,
    format: ExportFormat,
    output: Option<PathBuf>,
    show_attempts: bool,
    quiet: bool,
) -> Result<()> {
    let out = Output::quiet(quiet);
    let raw = read_input(input)?;

    let recovery = ResponseRecoveryParser::new().parse(&raw)?;

    if show_attempts {
        out.attempts(&recovery.attempts);
    }
    if recovery.degraded {
        out.warning("No repair strategy succeeded; using verbatim fallback");
    } else {
        out.info(&format!("Recovered with {}", recovery.strategy()));
    }

    write_output(&recovery.pathway.export(format)?, output.as_deref())
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file_to_markdown() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.txt");
        let output = dir.path().join("pathway.md");
        std::fs::write(
            &input,
            r#"{"pathway_name":"P","sections":[{"title":"S1","modules":[{"title":"M1","content":"C1"}]}]} garbage"#,
        )
        .unwrap();

        run(&input, ExportFormat::Markdown, Some(output.clone()), false, true).unwrap();

        let md = std::fs::read_to_string(&output).unwrap();
        assert!(md.starts_with("# P\n"));
        assert!(md.contains("### M1"));
    }

    #[test]
    fn test_parse_empty_file_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.txt");
        std::fs::write(&input, "  \n").unwrap();

        assert!(run(&input, ExportFormat::Json, None, false, true).is_err());
    }
}
