//! Ollama-compatible generate client.
//!
//! # Responsibilities
//! - Send one prompt to `/api/generate` (non-streaming) and return the text
//! - Map transport, status and decoding problems onto `ModelError`
//!
//! Bounding the call and fast-failing a sick server are left to the
//! resilience guards the caller wraps this in.

use reqwest::Client;

use crate::config::ModelConfig;
use crate::model::types::{GenerateOptions, GenerateRequest, GenerateResponse, ModelError};

/// Client for one model on one server.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    config: ModelConfig,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, config: ModelConfig) -> Result<Self, ModelError> {
        Ok(Self::with_client(http_client()?, base_url, config))
    }

    /// Reuse an existing HTTP client (and its connection pool).
    pub fn with_client(http: Client, base_url: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Generate a completion for `prompt`.
    pub async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = self.build_url("/api/generate");
        let payload = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            keep_alive: &self.config.keep_alive,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_ctx: self.config.num_ctx,
                num_predict: self.config.num_predict,
            },
        };

        tracing::info!(
            endpoint = %url,
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "Invoking model"
        );

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::network(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %url, status = %status, "Model server returned an error status");
            return Err(ModelError::Status {
                endpoint: url,
                status,
                body,
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ModelError::invalid_response(&url, e.to_string())
            } else {
                ModelError::network(&url, e)
            }
        })?;

        if let Some(error) = body.error {
            return Err(ModelError::invalid_response(&url, error));
        }
        let text = body
            .response
            .ok_or_else(|| ModelError::invalid_response(&url, "missing response"))?;

        tracing::debug!(endpoint = %url, response_chars = text.chars().count(), "Model responded");
        Ok(text)
    }
}

/// HTTP client for model calls. Overall call time is bounded by the guard.
pub fn http_client() -> Result<Client, ModelError> {
    Client::builder()
        .user_agent("callguard")
        .build()
        .map_err(ModelError::Client)
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}
