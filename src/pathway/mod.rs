//! Training pathway model: validated construction, edits and export.

mod edit;
mod export;
mod model;

pub use export::ExportFormat;
pub use model::{
    Flashcard, Module, ModulePosition, Pathway, QuizQuestion, Section, SelectedDocument, VideoRef,
};
