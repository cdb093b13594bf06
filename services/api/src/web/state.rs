//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::prompts::PromptStore;
use quickrev_core::ports::{
    FileCatalogService, FileStorageService, SessionVerificationService, TextGenerationService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn FileStorageService>,
    pub catalog: Arc<dyn FileCatalogService>,
    pub llm: Arc<dyn TextGenerationService>,
    pub identity: Arc<dyn SessionVerificationService>,
    pub prompts: Arc<PromptStore>,
}
