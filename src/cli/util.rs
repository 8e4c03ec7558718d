//! CLI Common Utilities
//!
//! Shared loading and output helpers for the command handlers.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::ingest::{SourceMaterial, load_all};
use crate::types::{PathwayError, Result, TrainingContext};

/// Read a training context from a TOML or JSON file
pub fn load_context(path: &Path) -> Result<TrainingContext> {
    let content = std::fs::read_to_string(path)?;

    let context: TrainingContext = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        _ => toml::from_str(&content).map_err(|e| {
            PathwayError::InvalidContext(format!("{}: {}", path.display(), e.message()))
        })?,
    };

    context.validate()?;
    Ok(context)
}

/// Read and extract source files with the configured concurrency
pub async fn load_sources(paths: &[PathBuf], config: &Config) -> Result<Vec<SourceMaterial>> {
    load_all(paths, config.ingest.max_concurrency).await
}

/// Write to `path`, or to stdout when no path is given
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_context_toml_and_json() {
        let dir = TempDir::new().unwrap();

        let toml_path = dir.path().join("ctx.toml");
        std::fs::write(
            &toml_path,
            "audience = \"Nurses\"\ngoals = \"Triage\"\nindustry = \"Health\"\ntimeline = \"1 month\"\n",
        )
        .unwrap();
        assert_eq!(load_context(&toml_path).unwrap().audience, "Nurses");

        let json_path = dir.path().join("ctx.json");
        std::fs::write(
            &json_path,
            r#"{"target_audience":"Nurses","primary_goals":"Triage","industry":"Health","timeline":""}"#,
        )
        .unwrap();
        assert!(matches!(
            load_context(&json_path),
            Err(PathwayError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_write_output_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("pathway.md");

        write_output("# P", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# P");
    }

    #[tokio::test]
    async fn test_load_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sop.txt");
        std::fs::write(&path, "Check the forks").unwrap();

        let sources = load_sources(&[path], &Config::default()).await.unwrap();
        assert_eq!(sources[0].name, "sop.txt");
        assert_eq!(sources[0].text, "Check the forks");
    }
}
