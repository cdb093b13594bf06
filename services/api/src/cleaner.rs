//! services/api/src/cleaner.rs
//!
//! Turns raw extracted document text into model-ready content in two passes:
//! a deterministic whitespace normalization, then a single LLM call that
//! strips boilerplate (headers, footers, page numbers) and restructures the
//! content without summarizing it. The model's response is trusted verbatim;
//! there is no check that boilerplate was actually removed.

use crate::prompts::{PromptKind, PromptStore};
use once_cell::sync::Lazy;
use quickrev_core::ports::{PortResult, TextGenerationService};
use regex::Regex;

static RE_EXCESS_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]{3,}").unwrap());
static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Collapses 3+ consecutive line breaks to one blank line, collapses runs of
/// horizontal whitespace to a single space, and trims the ends. Double
/// newlines survive as paragraph breaks.
pub fn normalize_whitespace(raw: &str) -> String {
    let text = RE_EXCESS_BREAKS.replace_all(raw, "\n\n");
    let text = RE_HORIZONTAL_WS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Normalizes `raw` and sends it through the cleanup prompt.
pub async fn clean_text(
    llm: &dyn TextGenerationService,
    prompts: &PromptStore,
    raw: &str,
) -> PortResult<String> {
    let normalized = normalize_whitespace(raw);
    let template = prompts.read(PromptKind::CleanRawText);
    let prompt = format!("{}\n\n{}", template, normalized);
    llm.send_prompt(&prompt).await
}
