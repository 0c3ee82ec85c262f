//! Outline generation.
//!
//! Maps a validated book brief to an ordered list of outline entries. The
//! requested chapter count is a soft target: the model may return more or
//! fewer chapters than asked for, which is accepted as-is. One attempt per
//! call; retry policy, if any, belongs to the caller.

use crate::core::generation::response::extract_payload;
use crate::core::generation::{prompts, GenerationError};
use crate::core::llm::config::ResolvedBackend;
use crate::core::llm::{ChatMessage, ChatRequest};
use crate::core::models::{BookBrief, OutlineEntry};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct OutlinePayload {
    outline: Vec<OutlineEntryPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutlineEntryPayload {
    chapter_title: String,
    #[serde(default)]
    subchapters: Vec<String>,
}

/// Generate a book outline for `brief` using the resolved backend.
pub async fn generate(
    backend: &ResolvedBackend,
    brief: &BookBrief,
) -> Result<Vec<OutlineEntry>, GenerationError> {
    debug!(model = %backend.model_id, "Requesting book outline");

    let request = ChatRequest::new(vec![ChatMessage::user(prompts::outline_user_prompt(brief))])
        .with_system(prompts::OUTLINE_SYSTEM_PROMPT);

    let response = backend.provider.generate(request).await?;

    let payload: OutlinePayload = extract_payload(&response.content).ok_or_else(|| {
        GenerationError::Parse("backend returned no parseable outline object".to_string())
    })?;

    let entries: Vec<OutlineEntry> = payload
        .outline
        .into_iter()
        .filter(|entry| !entry.chapter_title.trim().is_empty())
        .map(|entry| OutlineEntry {
            title: entry.chapter_title,
            subchapters: entry.subchapters,
        })
        .collect();

    info!(
        chapters = entries.len(),
        requested = brief.number_of_chapters,
        model = %backend.model_id,
        "Outline generated"
    );

    Ok(entries)
}

// ============================================================================
// Tests
// ============================================================================
