//! crates/quickrev_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any cloud backend or HTTP framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a fresh identifier usable both as a storage file id and as a
/// catalog document id (32 lowercase hex characters).
pub fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The role a stored file plays: an uploaded original, or one of the two
/// artifacts derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Original,
    Reviewer,
    Flashcards,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Original => "original",
            FileKind::Reviewer => "reviewer",
            FileKind::Flashcards => "flashcards",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown file type: {0}")]
pub struct UnknownFileKind(pub String);

impl std::str::FromStr for FileKind {
    type Err = UnknownFileKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(FileKind::Original),
            "reviewer" => Ok(FileKind::Reviewer),
            "flashcards" => Ok(FileKind::Flashcards),
            other => Err(UnknownFileKind(other.to_string())),
        }
    }
}

/// A catalog entry tying a stored blob to its owner and lineage.
///
/// `name` is the display name without extension. For originals,
/// `source_file_id` equals `file_id`; for derived artifacts it points at the
/// original they were generated from.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub kind: FileKind,
    pub name: String,
    pub file_id: String,
    pub source_file_id: String,
    pub updated_at: DateTime<Utc>,
}

// Everything needed to create a catalog entry; the backend assigns the
// record id and timestamp.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub user_id: String,
    pub kind: FileKind,
    pub name: String,
    pub file_id: String,
    pub source_file_id: String,
}

/// Metadata of a blob held in cloud storage.
#[derive(Debug, Clone)]
pub struct StoredFileInfo {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// The four flashcard shapes, in their canonical presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlashcardKind {
    MultipleChoice,
    Identification,
    TrueOrFalse,
    Enumeration,
}

impl FlashcardKind {
    /// All kinds in canonical order.
    pub const ALL: [FlashcardKind; 4] = [
        FlashcardKind::MultipleChoice,
        FlashcardKind::Identification,
        FlashcardKind::TrueOrFalse,
        FlashcardKind::Enumeration,
    ];

    /// The label used in prompts and in the serialized `type` field.
    pub fn label(&self) -> &'static str {
        match self {
            FlashcardKind::MultipleChoice => "Multiple Choice",
            FlashcardKind::Identification => "Identification",
            FlashcardKind::TrueOrFalse => "True or False",
            FlashcardKind::Enumeration => "Enumeration",
        }
    }
}

/// A single study item. Serializes with a `type` tag carrying the
/// human-readable kind label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Flashcard {
    #[serde(rename = "Multiple Choice")]
    MultipleChoice {
        question: String,
        choices: Vec<String>,
        answer: String,
    },
    #[serde(rename = "Identification")]
    Identification { question: String, answer: String },
    #[serde(rename = "True or False")]
    TrueOrFalse { statement: String, answer: bool },
    #[serde(rename = "Enumeration")]
    Enumeration {
        question: String,
        answers: Vec<String>,
    },
}

impl Flashcard {
    pub fn kind(&self) -> FlashcardKind {
        match self {
            Flashcard::MultipleChoice { .. } => FlashcardKind::MultipleChoice,
            Flashcard::Identification { .. } => FlashcardKind::Identification,
            Flashcard::TrueOrFalse { .. } => FlashcardKind::TrueOrFalse,
            Flashcard::Enumeration { .. } => FlashcardKind::Enumeration,
        }
    }
}

/// Sorts cards into the canonical kind order while preserving the model's
/// ordering within each kind.
pub fn sort_flashcards(cards: &mut [Flashcard]) {
    cards.sort_by_key(|c| c.kind());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Flashcard plan requests zero items")]
pub struct EmptyPlan;

/// How many flashcards of each kind a generation request asks for.
///
/// Counts are clamped to `0..=100` at construction; a plan whose total is
/// zero cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashcardPlan {
    multiple_choice: u32,
    identification: u32,
    true_or_false: u32,
    enumeration: u32,
}

impl FlashcardPlan {
    pub fn new(
        multiple_choice: i64,
        identification: i64,
        true_or_false: i64,
        enumeration: i64,
    ) -> Result<Self, EmptyPlan> {
        let clamp = |v: i64| v.clamp(0, 100) as u32;
        let plan = Self {
            multiple_choice: clamp(multiple_choice),
            identification: clamp(identification),
            true_or_false: clamp(true_or_false),
            enumeration: clamp(enumeration),
        };
        if plan.total() == 0 {
            return Err(EmptyPlan);
        }
        Ok(plan)
    }

    pub fn total(&self) -> u32 {
        self.multiple_choice + self.identification + self.true_or_false + self.enumeration
    }

    pub fn count(&self, kind: FlashcardKind) -> u32 {
        match kind {
            FlashcardKind::MultipleChoice => self.multiple_choice,
            FlashcardKind::Identification => self.identification,
            FlashcardKind::TrueOrFalse => self.true_or_false,
            FlashcardKind::Enumeration => self.enumeration,
        }
    }

    /// Counts in canonical order, including the zero entries.
    pub fn counts(&self) -> [(FlashcardKind, u32); 4] {
        [
            (FlashcardKind::MultipleChoice, self.multiple_choice),
            (FlashcardKind::Identification, self.identification),
            (FlashcardKind::TrueOrFalse, self.true_or_false),
            (FlashcardKind::Enumeration, self.enumeration),
        ]
    }
}
