//! Generation components.
//!
//! [`outline`] turns a book brief into a chapter skeleton,
//! [`chapter`] produces one chapter's prose, and [`orchestrator`] drives
//! the chapter lifecycle state machine over both.

pub mod chapter;
pub mod orchestrator;
pub mod outline;
pub mod prompts;
mod response;

use crate::core::llm::LLMError;

/// A generation backend call failed: transport error, non-2xx, timeout,
/// or a response with no parseable structured payload.
///
/// Never retried below the orchestrator; the orchestrator translates it
/// into the `generating -> pending` revert.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Backend error: {0}")]
    Backend(#[from] LLMError),

    #[error("No parseable structured result: {0}")]
    Parse(String),
}
