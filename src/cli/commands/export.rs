//! Export Command
//!
//! Converts a saved pathway JSON file to another format.
//!
//! Usage:
//!   pathwright export pathway.json -f markdown [-o mindmap.md]

use std::path::{Path, PathBuf};

use crate::cli::write_output;
use crate::pathway::{ExportFormat, Pathway};
use crate::types::Result;

pub fn run(input: &Path, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let content = std::fs::read_to_string(input)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let pathway = Pathway::from_parsed(&value)?;

    write_output(&pathway.export(format)?, output.as_deref())
}
