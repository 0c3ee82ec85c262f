//! Gemini Provider Implementation
//!
//! Cloud text generation against the Google Generative Language API. The
//! API key is read from the environment (`GEMINI_API_KEY`, falling back to
//! `GOOGLE_API_KEY`); a missing key is reported on the first request, not
//! at construction.

use crate::core::llm::{
    ChatRequest, ChatResponse, GenerationProvider, LLMError, MessageRole, Result, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default max tokens per response.
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Cloud provider for the Gemini model family.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE.to_string(),
            client,
        }
    }

    /// Create a provider with the API key taken from the environment.
    pub fn from_env(model: impl Into<String>, timeout: Duration) -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
        Self::new(api_key, model, timeout)
    }

    /// Override the API base URL (test servers, regional endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        MessageRole::Assistant => "model",
                        _ => "user",
                    },
                    "parts": [{"text": m.content}]
                })
            })
            .collect();

        let mut generation_config = serde_json::Map::new();
        generation_config.insert(
            "maxOutputTokens".to_string(),
            serde_json::json!(DEFAULT_MAX_TOKENS),
        );
        if let Some(temp) = request.temperature {
            generation_config.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(seed) = request.seed {
            generation_config.insert("seed".to_string(), serde_json::json!(seed));
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config
        });

        if let Some(system) = &request.system_prompt {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": system}]
            });
        }

        body
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(LLMError::Auth(
                "No Gemini API key configured. Set GEMINI_API_KEY.".to_string(),
            ));
        }

        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = self.build_body(&request);

        debug!(model = %self.model, "Sending chat request to Gemini");

        let start = std::time::Instant::now();
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::Http(e)
                }
            })?;

        let status = resp.status();
        let latency = start.elapsed().as_millis() as u64;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(LLMError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LLMError::Auth("Invalid API key".to_string()));
        }

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LLMError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let json: serde_json::Value = resp.json().await?;

        let parts = json["candidates"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["content"]["parts"].as_array())
            .ok_or_else(|| LLMError::InvalidResponse("Missing candidates".to_string()))?;

        let content: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(LLMError::InvalidResponse("Empty candidate text".to_string()));
        }

        let usage = json["usageMetadata"].as_object().map(|u| TokenUsage {
            input_tokens: u
                .get("promptTokenCount")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: u
                .get("candidatesTokenCount")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
        });

        info!(
            model = %self.model,
            latency_ms = latency,
            "Received response from Gemini"
        );

        Ok(ChatResponse {
            content,
            model: self.model.clone(),
            provider: "gemini".to_string(),
            usage,
            latency_ms: latency,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
