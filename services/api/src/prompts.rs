//! services/api/src/prompts.rs
//!
//! Instructional prompt templates for the LLM calls.
//!
//! Centralising every template here serves two purposes:
//!
//! 1. **Single source of truth** — changing a default behaviour (e.g. the
//!    flashcard JSON schema) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompts directly
//!    without a live model.
//!
//! Each template ships compiled into the binary, and a deployment can replace
//! one by dropping `<name>.txt` into the configured prompts directory.

use std::path::PathBuf;
use tracing::warn;

/// The three prompt templates the service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Strip extraction artifacts from raw document text without summarizing.
    CleanRawText,
    /// Produce the reviewer Markdown document.
    GenerateReviewer,
    /// Produce the flashcards JSON array.
    GenerateFlashcards,
}

impl PromptKind {
    /// The file stem used for on-disk overrides (`{prompts_path}/{stem}.txt`).
    pub fn file_stem(&self) -> &'static str {
        match self {
            PromptKind::CleanRawText => "clean_raw_txt",
            PromptKind::GenerateReviewer => "generate_reviewer",
            PromptKind::GenerateFlashcards => "generate_flashcards",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            PromptKind::CleanRawText => include_str!("../prompts/clean_raw_txt.txt"),
            PromptKind::GenerateReviewer => include_str!("../prompts/generate_reviewer.txt"),
            PromptKind::GenerateFlashcards => include_str!("../prompts/generate_flashcards.txt"),
        }
    }
}

/// Resolves prompt templates, preferring on-disk overrides over the
/// compiled-in defaults.
#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the template text for `kind`.
    ///
    /// Missing override files are normal (the defaults apply); an override
    /// that exists but cannot be read is logged and skipped.
    pub fn read(&self, kind: PromptKind) -> String {
        let path = self.dir.join(format!("{}.txt", kind.file_stem()));
        if path.is_file() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return text,
                Err(e) => {
                    warn!("Failed to read prompt override {}: {}", path.display(), e);
                }
            }
        }
        kind.builtin().to_string()
    }
}
