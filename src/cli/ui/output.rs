//! Terminal output helpers.
//!
//! Status lines go to stderr so stdout carries only the exported pathway.

use console::style;

use crate::ai::validation::ParseAttempt;
use crate::pathway::Pathway;

pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            eprintln!("\n{}", style(message).bold());
            eprintln!("{}", "─".repeat(40));
        }
    }

    /// One line per repair attempt: strategy, outcome, note
    pub fn attempts(&self, attempts: &[ParseAttempt]) {
        self.section("Parse attempts");
        for attempt in attempts {
            let mark = if attempt.success {
                style("✓").green()
            } else {
                style("·").dim()
            };
            let note = attempt.note.as_deref().unwrap_or("");
            eprintln!("  {} {:<20} {}", mark, attempt.strategy.name(), style(note).dim());
        }
    }

    /// Section/module tree without content
    pub fn summary(&self, pathway: &Pathway) {
        if self.quiet {
            return;
        }
        eprintln!("\n{}", style(pathway.name()).bold().underlined());
        for (s_idx, section) in pathway.sections().iter().enumerate() {
            eprintln!("  {}. {}", s_idx + 1, style(section.title()).bold());
            for module in section.modules() {
                eprintln!("     - {}", module.title());
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
