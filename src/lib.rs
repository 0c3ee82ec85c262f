//! BookWright - book drafting assistant core.
//!
//! The generation orchestration layer of a book-drafting assistant: turn a
//! book brief into a chapter outline, then generate or refine chapters
//! sequentially, feeding prior-chapter content forward for narrative
//! coherence. UI, storage backends beyond the bundled stores, and export
//! are external collaborators.

// Public module exports
pub mod core;

pub use crate::core::generation::chapter::{ChapterRequest, GenerationMode};
pub use crate::core::generation::orchestrator::{
    BatchMode, BatchReport, ChapterFailure, ChapterPatch, GenerationOptions,
    GenerationOrchestrator, OrchestratorError,
};
pub use crate::core::generation::GenerationError;
pub use crate::core::llm::config::{ProviderResolver, ResolveBackend, ResolvedBackend};
pub use crate::core::llm::providers::{GeminiProvider, OllamaProvider};
pub use crate::core::llm::{GenerationProvider, LLMError};
pub use crate::core::models::{
    BookBrief, BookProject, Chapter, ChapterStatus, OutlineEntry, ProjectStatus, ValidationError,
};
pub use crate::core::settings::{
    ConfigError, GenerationDefaults, ProviderKind, ProviderSelection, Settings,
};
pub use crate::core::storage::{JsonProjectStore, MemoryProjectStore, ProjectStore, StorageError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
