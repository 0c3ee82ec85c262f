//! Generation Provider Implementations
//!
//! Concrete implementations of the `GenerationProvider` trait for the
//! supported backends.

mod gemini;
mod ollama;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
