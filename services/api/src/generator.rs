//! services/api/src/generator.rs
//!
//! Builds the generation prompts and drives the single LLM call for each of
//! the two derived artifacts: the reviewer Markdown document and the
//! flashcards JSON array.

use crate::prompts::{PromptKind, PromptStore};
use once_cell::sync::Lazy;
use quickrev_core::domain::{Flashcard, FlashcardPlan};
use quickrev_core::ports::{PortResult, TextGenerationService};
use regex::Regex;

/// Produces the reviewer document. The response is assumed to be Markdown and
/// is used as-is.
pub async fn generate_reviewer(
    llm: &dyn TextGenerationService,
    prompts: &PromptStore,
    content: &str,
) -> PortResult<String> {
    let template = prompts.read(PromptKind::GenerateReviewer);
    let prompt = format!("{}\n\n{}", template, content);
    llm.send_prompt(&prompt).await
}

/// Produces the flashcards for `plan`. Returns the model's raw response text;
/// parsing is the caller's job via [`parse_flashcards`].
pub async fn generate_flashcards(
    llm: &dyn TextGenerationService,
    prompts: &PromptStore,
    content: &str,
    plan: &FlashcardPlan,
) -> PortResult<String> {
    let template = prompts.read(PromptKind::GenerateFlashcards);
    let prompt = build_flashcard_prompt(&template, content, plan);
    llm.send_prompt(&prompt).await
}

/// Assembles the flashcard prompt: the base template, an instruction block
/// derived from the plan (total, per-type quantities for the enabled types,
/// and the mandatory type ordering), then the delimited content.
fn build_flashcard_prompt(template: &str, content: &str, plan: &FlashcardPlan) -> String {
    let quantities: Vec<String> = plan
        .counts()
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| format!("{} (Quantity: {})", kind.label(), count))
        .collect();
    let types_quantity_list = quantities.join("\n * ");

    format!(
        "{template}\n\n\
         --- INSTRUCTIONS ---\n\
         1. The total number of flashcards to generate MUST be **{total}**.\n\
         2. The required breakdown of flashcard types and their exact quantities are:\n \
         * {types_quantity_list}\n\
         3. **SORTING REQUIREMENT**: The flashcards in the JSON array MUST be sorted by 'Type' in the following order: **Multiple Choice, Identification, True or False, Enumeration**.\n\
         4. **QUANTITY REQUIREMENT**: Strictly adhere to the quantity specified for each type.\n\n\
         --- CONTENT TO ANALYZE ---\n\
         ---\n\
         {content}\n\
         ---",
        template = template,
        total = plan.total(),
        types_quantity_list = types_quantity_list,
        content = content,
    )
}

// Models sometimes wrap the array in a code fence despite the prompt saying
// not to. Stripping the outer fence is the only tolerated repair; anything
// else that fails to parse is fatal.
static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = RE_OUTER_FENCE.captures(trimmed) {
        caps[1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parses the model's response as a flashcard array.
pub fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, serde_json::Error> {
    serde_json::from_str(&strip_outer_fence(raw))
}
