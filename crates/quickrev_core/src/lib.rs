pub mod domain;
pub mod ports;

pub use domain::{
    sort_flashcards, unique_id, EmptyPlan, FileKind, FileRecord, Flashcard, FlashcardKind,
    FlashcardPlan, NewFileRecord, StoredFileInfo, UnknownFileKind,
};
pub use ports::{
    FileCatalogService, FileStorageService, PortError, PortResult, SessionVerificationService,
    TextGenerationService,
};
