//! HTTP probe for a model server on a well-known local port.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::config::ProbeConfig;
use crate::resilience::CancelSignal;

/// Errors raised by the probe itself (not by what it probes).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build probe HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("probe cancelled before all candidates were tried")]
    Cancelled,
}

/// Probes a fixed set of candidate endpoints on one base address.
#[derive(Debug, Clone)]
pub struct ServiceProbe {
    client: Client,
    base_url: String,
    paths: Vec<String>,
    request_timeout: Duration,
}

impl ServiceProbe {
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let request_timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(request_timeout)
            .no_proxy()
            .user_agent("callguard-probe")
            .build()
            .map_err(ProbeError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            paths: config.paths.clone(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the base URL if anything answers on one of the candidate paths.
    pub async fn detect(&self, cancel: Option<&CancelSignal>) -> Result<Option<String>, ProbeError> {
        for path in &self.paths {
            if cancel.is_some_and(CancelSignal::is_cancelled) {
                tracing::debug!(base_url = %self.base_url, "Probe cancelled");
                return Err(ProbeError::Cancelled);
            }

            let url = format!("{}{}", self.base_url, path);
            match self.client.get(&url).send().await {
                Ok(response) => {
                    tracing::info!(url = %url, status = %response.status(), "Local service detected");
                    return Ok(Some(self.base_url.clone()));
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!(
                        url = %url,
                        timeout_ms = self.request_timeout.as_millis() as u64,
                        "Probe candidate timed out"
                    );
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Probe candidate unreachable");
                }
            }
        }

        tracing::info!(base_url = %self.base_url, candidates = self.paths.len(), "No local service detected");
        Ok(None)
    }
}
