//! Settings collaborator surface.
//!
//! The settings layer owns the current provider selection and the
//! generation defaults. The core reads them per call; a changed selection
//! takes effect on the next generation call, not retroactively.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default local inference host, matching a stock Ollama install.
pub const DEFAULT_LOCAL_HOST: &str = "http://127.0.0.1:11434";

/// Default local model name.
pub const DEFAULT_LOCAL_MODEL: &str = "gemma";

/// Request timeout for the cloud provider.
pub const CLOUD_TIMEOUT: Duration = Duration::from_secs(120);

/// Request timeout for local providers. Local round trips run on the order
/// of minutes; a short HTTP timeout would truncate long generations.
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(600);

// ============================================================================
// Errors
// ============================================================================

/// Invalid or incomplete provider selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("local provider selected without a host")]
    MissingHost,

    #[error("local provider selected without a model")]
    MissingModel,

    #[error("invalid local host URL: {0}")]
    InvalidHost(String),
}

// ============================================================================
// Provider Selection
// ============================================================================

/// Which text-generation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Cloud-hosted model family (Gemini).
    #[default]
    Cloud,
    /// Locally reachable Ollama server.
    Local,
}

/// User-facing backend selection. `host`/`model`/`timeout_secs` only apply
/// to the local kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSelection {
    pub kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderSelection {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Cloud,
            host: Some(DEFAULT_LOCAL_HOST.to_string()),
            model: Some(DEFAULT_LOCAL_MODEL.to_string()),
            timeout_secs: None,
        }
    }
}

/// A validated local endpoint extracted from a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEndpoint {
    pub host: Url,
    pub model: String,
    pub timeout: Duration,
}

impl ProviderSelection {
    pub fn cloud() -> Self {
        Self {
            kind: ProviderKind::Cloud,
            host: None,
            model: None,
            timeout_secs: None,
        }
    }

    pub fn local(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Local,
            host: Some(host.into()),
            model: Some(model.into()),
            timeout_secs: None,
        }
    }

    /// Validate the local parts of this selection. A local selection with a
    /// missing host or model fails closed here rather than producing a
    /// malformed request downstream.
    pub fn local_endpoint(&self) -> Result<LocalEndpoint, ConfigError> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost)?;
        let model = self
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or(ConfigError::MissingModel)?;

        let host = Url::parse(host).map_err(|e| ConfigError::InvalidHost(e.to_string()))?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidHost(format!(
                "unsupported scheme: {}",
                host.scheme()
            )));
        }

        Ok(LocalEndpoint {
            host,
            model: model.to_string(),
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(LOCAL_TIMEOUT),
        })
    }

    /// Stable serialized form, used as the resolver's memoization key.
    pub fn memo_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Generation Defaults
// ============================================================================

/// Per-user defaults applied when a generation call does not override them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_words: Option<u32>,
}

/// Snapshot of the settings the core reads for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub provider: ProviderSelection,
    #[serde(default)]
    pub defaults: GenerationDefaults,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_is_cloud_with_local_prefill() {
        let sel = ProviderSelection::default();
        assert_eq!(sel.kind, ProviderKind::Cloud);
        assert_eq!(sel.host.as_deref(), Some(DEFAULT_LOCAL_HOST));
        assert_eq!(sel.model.as_deref(), Some(DEFAULT_LOCAL_MODEL));
    }

    #[test]
    fn local_endpoint_rejects_missing_host() {
        let sel = ProviderSelection {
            kind: ProviderKind::Local,
            host: Some("".to_string()),
            model: Some("x".to_string()),
            timeout_secs: None,
        };
        assert_eq!(sel.local_endpoint(), Err(ConfigError::MissingHost));
    }

    #[test]
    fn local_endpoint_rejects_missing_model() {
        let sel = ProviderSelection {
            kind: ProviderKind::Local,
            host: Some(DEFAULT_LOCAL_HOST.to_string()),
            model: None,
            timeout_secs: None,
        };
        assert_eq!(sel.local_endpoint(), Err(ConfigError::MissingModel));
    }

    #[test]
    fn local_endpoint_rejects_garbage_host() {
        let sel = ProviderSelection::local("not a url", "gemma");
        assert!(matches!(
            sel.local_endpoint(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn local_endpoint_rejects_non_http_scheme() {
        let sel = ProviderSelection::local("ftp://127.0.0.1:11434", "gemma");
        assert!(matches!(
            sel.local_endpoint(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn local_endpoint_defaults_to_long_timeout() {
        let ep = ProviderSelection::local(DEFAULT_LOCAL_HOST, "gemma")
            .local_endpoint()
            .unwrap();
        assert_eq!(ep.timeout, LOCAL_TIMEOUT);
        assert_eq!(ep.model, "gemma");
    }

    #[test]
    fn memo_key_changes_with_selection() {
        let a = ProviderSelection::local(DEFAULT_LOCAL_HOST, "gemma");
        let mut b = a.clone();
        assert_eq!(a.memo_key(), b.memo_key());
        b.model = Some("llama3".to_string());
        assert_ne!(a.memo_key(), b.memo_key());
    }
}
