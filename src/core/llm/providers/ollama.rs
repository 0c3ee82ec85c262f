//! Ollama Provider Implementation
//!
//! Local text generation against an Ollama server's `/api/chat` endpoint.

use crate::core::llm::{
    ChatRequest, ChatResponse, GenerationProvider, LLMError, MessageRole, Result, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Local provider for an Ollama-compatible server.
pub struct OllamaProvider {
    host: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    /// Create a provider for `host` bound to `model`.
    ///
    /// `timeout` must cover a full local generation round trip — minutes,
    /// not the seconds typical of cloud calls.
    pub fn new(host: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            host: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }

    fn build_messages(&self, request: &ChatRequest) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system
            }));
        }

        for msg in &request.messages {
            messages.push(serde_json::json!({
                "role": match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                "content": msg.content
            }));
        }

        messages
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut options = serde_json::Map::new();
        if let Some(temp) = request.temperature {
            options.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(seed) = request.seed {
            options.insert("seed".to_string(), serde_json::json!(seed));
        }

        serde_json::json!({
            "model": self.model,
            "messages": self.build_messages(request),
            "stream": false,
            "options": options
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.host);
        let body = self.build_body(&request);

        debug!(model = %self.model, host = %self.host, "Sending chat request to Ollama");

        let start = std::time::Instant::now();
        let resp = self
            .client
            .post(&url)
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

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LLMError::Api { status, message: text });
        }

        let json: serde_json::Value = resp.json().await?;
        let latency = start.elapsed().as_millis() as u64;

        let content = json["message"]["content"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage = Some(TokenUsage {
            input_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            output_tokens: json["eval_count"].as_u64().unwrap_or(0) as u32,
        });

        info!(
            model = %self.model,
            latency_ms = latency,
            "Received response from Ollama"
        );

        Ok(ChatResponse {
            content,
            model: self.model.clone(),
            provider: "ollama".to_string(),
            usage,
            latency_ms: latency,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
