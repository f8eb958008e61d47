//! Wire types and errors for model inference.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub keep_alive: &'a str,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_ctx: u32,
    pub num_predict: u32,
}

/// The parts of a non-streaming generate response we use.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Errors from a single model invocation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error calling {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("{endpoint} returned invalid response: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("model call cancelled")]
    Cancelled,

    #[error("failed to build model HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ModelError {
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error says something about the service's health.
    ///
    /// Client errors (4xx other than 408 and 429) are the caller's fault and
    /// should not trip a breaker.
    pub fn is_service_failure(&self) -> bool {
        match self {
            ModelError::Status { status, .. } => {
                !status.is_client_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ModelError {
        ModelError::Status {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_service_failure_classification() {
        assert!(status(500).is_service_failure());
        assert!(status(503).is_service_failure());
        assert!(status(429).is_service_failure());
        assert!(status(408).is_service_failure());
        assert!(!status(404).is_service_failure());
        assert!(!status(400).is_service_failure());
        assert!(ModelError::invalid_response("x", "missing response").is_service_failure());
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "gemma3:latest",
            prompt: "hi",
            stream: false,
            keep_alive: "30m",
            options: GenerateOptions {
                temperature: 0.0,
                num_ctx: 16384,
                num_predict: 512,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_ctx"], 16384);
        assert_eq!(json["keep_alive"], "30m");
    }

    #[test]
    fn test_error_display() {
        let err = status(500);
        assert_eq!(
            err.to_string(),
            "http://localhost:11434/api/generate returned 500 Internal Server Error: "
        );
    }
}
