//! Chapter content generation.
//!
//! Produces the body text for one chapter from its outline, the book-level
//! context, and the accumulated content of earlier chapters. Refine-vs-
//! scratch is a tagged union so the contract is exhaustively checked
//! rather than inferred from an optional field.

use crate::core::generation::response::extract_payload;
use crate::core::generation::{prompts, GenerationError};
use crate::core::llm::config::ResolvedBackend;
use crate::core::llm::{ChatMessage, ChatRequest};
use crate::core::models::BookBrief;
use serde::Deserialize;
use tracing::{debug, info};

/// How to produce the chapter body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationMode {
    /// Write from the outline and prior-chapter context only.
    Scratch,
    /// Revise existing content per the request's extra instruction.
    Refine { existing: String },
}

impl GenerationMode {
    /// Build the mode from a refine flag and the chapter's current content.
    /// Refine without non-empty existing content degrades to scratch.
    pub fn from_parts(refine: bool, existing: &str) -> Self {
        if refine && !existing.trim().is_empty() {
            Self::Refine {
                existing: existing.to_string(),
            }
        } else {
            Self::Scratch
        }
    }

    pub fn is_refine(&self) -> bool {
        matches!(self, Self::Refine { .. })
    }
}

/// Ephemeral parameters for one content-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRequest {
    pub brief: BookBrief,
    /// The chapter's outline serialized to a single instruction block.
    pub chapter_outline: String,
    /// Ordered concatenation of earlier chapters' content.
    pub previous_content: String,
    pub mode: GenerationMode,
    pub extra_instruction: Option<String>,
    pub min_words: Option<u32>,
    pub temperature: Option<f32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterPayload {
    chapter_content: String,
}

/// Generate or refine one chapter's body text.
pub async fn generate(
    backend: &ResolvedBackend,
    request: &ChapterRequest,
) -> Result<String, GenerationError> {
    debug!(
        model = %backend.model_id,
        refine = request.mode.is_refine(),
        "Requesting chapter content"
    );

    let mut chat = ChatRequest::new(vec![ChatMessage::user(prompts::chapter_user_prompt(request))])
        .with_system(prompts::CHAPTER_SYSTEM_PROMPT);
    if let Some(temperature) = request.temperature {
        chat = chat.with_temperature(temperature);
    }
    if let Some(seed) = request.seed {
        chat = chat.with_seed(seed);
    }

    let response = backend.provider.generate(chat).await?;

    let payload: ChapterPayload = extract_payload(&response.content).ok_or_else(|| {
        GenerationError::Parse("backend returned no parseable chapter content".to_string())
    })?;

    if payload.chapter_content.trim().is_empty() {
        return Err(GenerationError::Parse("chapter content is empty".to_string()));
    }

    info!(
        model = %backend.model_id,
        chars = payload.chapter_content.len(),
        "Chapter content generated"
    );

    Ok(payload.chapter_content)
}

// ============================================================================
// Tests
// ============================================================================
