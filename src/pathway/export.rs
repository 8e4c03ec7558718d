//! Pathway export formats.
//!
//! JSON and YAML are flat serde mappings of the model. Markdown is a heading
//! outline that mind-map renderers (markmap and similar) turn into a tree.

use std::fmt::Write as _;
use std::str::FromStr;

use super::model::Pathway;
use crate::types::{PathwayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
}

impl FromStr for ExportFormat {
    type Err = PathwayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "markdown" | "md" | "mindmap" => Ok(Self::Markdown),
            other => Err(PathwayError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

impl Pathway {
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            ExportFormat::Markdown => Ok(self.to_outline()),
        }
    }

    /// `#` pathway, `##` section, `###` module, bullets for objectives and key points
    pub fn to_outline(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# {}", self.name().trim());
        if !self.description().is_empty() {
            let _ = writeln!(out, "\n{}", self.description());
        }

        for section in self.sections() {
            let _ = writeln!(out, "\n## {}", section.title().trim());

            for module in section.modules() {
                let _ = writeln!(out, "\n### {}", module.title().trim());
                if !module.description().trim().is_empty() {
                    let _ = writeln!(out, "\n{}", module.description().trim());
                }
                if !module.learning_objectives().is_empty() {
                    let _ = writeln!(out, "\n- Learning objectives");
                    for objective in module.learning_objectives() {
                        let _ = writeln!(out, "  - {}", objective);
                    }
                }
                if !module.key_points().is_empty() {
                    let _ = writeln!(out, "\n- Key points");
                    for point in module.key_points() {
                        let _ = writeln!(out, "  - {}", point);
                    }
                }
            }
        }

        out
    }
}
