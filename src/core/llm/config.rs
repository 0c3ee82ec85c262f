//! Provider resolution.
//!
//! Turns a user's `ProviderSelection` into a ready-to-use generation
//! handle bound to a model identifier. Resolution is explicit two-phase
//! initialization: resolve once, then call `generate` on the handle.

use crate::core::llm::providers::{GeminiProvider, OllamaProvider};
use crate::core::llm::GenerationProvider;
use crate::core::settings::{ProviderKind, ProviderSelection, CLOUD_TIMEOUT};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Model used whenever the cloud provider is selected or degraded to.
pub const CLOUD_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// A generation handle plus the resolved model identifier — namespaced
/// `"ollama/<model>"` for local backends, the fixed default for cloud.
#[derive(Clone)]
pub struct ResolvedBackend {
    pub provider: Arc<dyn GenerationProvider>,
    pub model_id: String,
}

/// Seam between the orchestrator and provider construction.
pub trait ResolveBackend: Send + Sync {
    fn resolve(&self, selection: &ProviderSelection) -> ResolvedBackend;
}

/// Default resolver. Memoizes the last-built handle keyed by the
/// serialized selection so a batch over many chapters reuses one client;
/// a changed selection rebuilds on the next call.
#[derive(Default)]
pub struct ProviderResolver {
    cache: Mutex<Option<(String, ResolvedBackend)>>,
}

impl ProviderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(selection: &ProviderSelection) -> ResolvedBackend {
        match selection.kind {
            ProviderKind::Cloud => Self::cloud(),
            ProviderKind::Local => match selection.local_endpoint() {
                Ok(endpoint) => {
                    let host = endpoint.host.as_str().trim_end_matches('/').to_string();
                    let model_id = format!("ollama/{}", endpoint.model);
                    debug!(host = %host, model = %model_id, "Resolved local provider");
                    ResolvedBackend {
                        provider: Arc::new(OllamaProvider::new(
                            host,
                            endpoint.model,
                            endpoint.timeout,
                        )),
                        model_id,
                    }
                }
                Err(error) => {
                    warn!(%error, "Local provider misconfigured, falling back to cloud provider");
                    Self::cloud()
                }
            },
        }
    }

    fn cloud() -> ResolvedBackend {
        ResolvedBackend {
            provider: Arc::new(GeminiProvider::from_env(CLOUD_DEFAULT_MODEL, CLOUD_TIMEOUT)),
            model_id: CLOUD_DEFAULT_MODEL.to_string(),
        }
    }
}

impl ResolveBackend for ProviderResolver {
    fn resolve(&self, selection: &ProviderSelection) -> ResolvedBackend {
        let key = selection.memo_key();
        let mut cache = self.cache.lock().expect("resolver cache poisoned");

        if let Some((cached_key, backend)) = cache.as_ref() {
            if *cached_key == key {
                return backend.clone();
            }
        }

        let backend = Self::build(selection);
        *cache = Some((key, backend.clone()));
        backend
    }
}

// ============================================================================
// Tests
// ============================================================================
