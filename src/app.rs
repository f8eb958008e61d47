//! Wiring of the guarded probe and model calls.
//!
//! # Data Flow
//! ```text
//! App::invoke(prompt)
//!     → resolve_base_url: configured/env URL, else guarded probe, else fallback
//!     → model breaker (threshold 2 / 30s by default)
//!         → timeout guard (20s by default)
//!             → OllamaClient::generate
//!     ← text, or a GuardError the CLI turns into a fallback line
//! ```
//!
//! The probe and the model each own one breaker for the lifetime of the
//! `App`, so failures accumulate across calls.

use std::sync::Arc;

use thiserror::Error;

use crate::config::GuardConfig;
use crate::model::{self, ModelError, OllamaClient};
use crate::probe::{ProbeError, ServiceProbe};
use crate::resilience::{
    with_cancellable_timeout, with_circuit_breaker, CancelSignal, CircuitBreaker, CircuitSnapshot, GuardError,
    Guarded, InvalidGuardConfig, TimeoutGuard,
};

pub type ProbeOutcome = Result<Option<String>, GuardError<ProbeError>>;
pub type InvokeOutcome = Result<String, GuardError<ModelError>>;

/// Errors building an `App` from configuration.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid guard settings: {0}")]
    Guard(#[from] InvalidGuardConfig),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub struct App {
    config: GuardConfig,
    probe_breaker: Arc<CircuitBreaker<GuardError<ProbeError>>>,
    model_breaker: Arc<CircuitBreaker<GuardError<ModelError>>>,
    probe: Guarded<(), Option<String>, GuardError<ProbeError>>,
    model_timeout: TimeoutGuard,
    model_http: reqwest::Client,
}

impl App {
    pub fn new(config: GuardConfig) -> Result<Self, AppError> {
        let probe_breaker = Arc::new(CircuitBreaker::from_config("probe", &config.breakers.probe)?);

        // 4xx responses mean the request was wrong, not that the server is sick.
        let model_breaker = Arc::new(
            CircuitBreaker::from_config("model", &config.breakers.model)?.with_failure_predicate(
                |err: &GuardError<ModelError>| match err {
                    GuardError::Operation(e) => e.is_service_failure(),
                    _ => true,
                },
            ),
        );

        let service_probe = Arc::new(ServiceProbe::new(&config.probe)?);
        let probe = with_circuit_breaker(
            with_cancellable_timeout(
                move |(), cancel: CancelSignal| {
                    let service_probe = service_probe.clone();
                    async move { service_probe.detect(Some(&cancel)).await.map_err(GuardError::Operation) }
                },
                TimeoutGuard::new(config.timeouts.probe())?,
            ),
            probe_breaker.clone(),
        );

        let model_timeout = TimeoutGuard::new(config.timeouts.model())?;
        let model_http = model::http_client()?;

        Ok(Self {
            config,
            probe_breaker,
            model_breaker,
            probe,
            model_timeout,
            model_http,
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Look for a model server on the configured local port.
    pub async fn detect_local_service(&self) -> ProbeOutcome {
        self.probe.call(()).await
    }

    /// Pick the model server to talk to.
    ///
    /// Never fails: detection problems are logged and the fallback URL used.
    pub async fn resolve_base_url(&self) -> String {
        if let Some(url) = &self.config.model.base_url {
            return url.clone();
        }

        if self.config.probe.enabled {
            match self.detect_local_service().await {
                Ok(Some(url)) => return url,
                Ok(None) => {
                    tracing::info!(fallback = %self.config.model.fallback_url, "Using fallback model URL");
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        fallback = %self.config.model.fallback_url,
                        "Local service detection failed, using fallback model URL"
                    );
                }
            }
        }

        self.config.model.fallback_url.clone()
    }

    /// Guarded inference against `base_url`, sharing this app's model breaker
    /// and HTTP connection pool.
    pub fn inference(&self, base_url: impl Into<String>) -> Guarded<String, String, GuardError<ModelError>> {
        let client = Arc::new(OllamaClient::with_client(
            self.model_http.clone(),
            base_url,
            self.config.model.clone(),
        ));

        let timed = with_cancellable_timeout(
            move |prompt: String, cancel: CancelSignal| {
                let client = client.clone();
                async move {
                    tokio::select! {
                        result = client.generate(&prompt) => result.map_err(GuardError::Operation),
                        _ = cancel.cancelled() => Err(GuardError::Operation(ModelError::Cancelled)),
                    }
                }
            },
            self.model_timeout,
        );

        with_circuit_breaker(timed, self.model_breaker.clone())
    }

    /// Resolve the model server and send one prompt.
    pub async fn invoke(&self, prompt: &str) -> InvokeOutcome {
        let base_url = self.resolve_base_url().await;
        self.invoke_at(&base_url, prompt).await
    }

    pub async fn invoke_at(&self, base_url: &str, prompt: &str) -> InvokeOutcome {
        self.inference(base_url).call(prompt.to_string()).await
    }

    /// Model text on success, a fallback line otherwise.
    pub async fn invoke_or_fallback(&self, prompt: &str) -> String {
        match self.invoke(prompt).await {
            Ok(text) => text,
            Err(e) => fallback_message(&e),
        }
    }

    pub fn breaker_snapshots(&self) -> [(&str, CircuitSnapshot); 2] {
        [
            (self.probe_breaker.name(), self.probe_breaker.snapshot()),
            (self.model_breaker.name(), self.model_breaker.snapshot()),
        ]
    }

    pub fn model_breaker(&self) -> &Arc<CircuitBreaker<GuardError<ModelError>>> {
        &self.model_breaker
    }

    pub fn probe_breaker(&self) -> &Arc<CircuitBreaker<GuardError<ProbeError>>> {
        &self.probe_breaker
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("probe_breaker", &self.probe_breaker)
            .field("model_breaker", &self.model_breaker)
            .field("model_timeout", &self.model_timeout)
            .finish_non_exhaustive()
    }
}

/// The line shown to the user in place of model output.
pub fn fallback_message(err: &GuardError<ModelError>) -> String {
    match err {
        GuardError::CircuitOpen(e) => format!("LLM circuit open or prevented call: {}", e),
        GuardError::Timeout(e) => format!("LLM invocation timed out: {}", e),
        GuardError::Operation(e) => format!("LLM invocation failed: {}", e),
    }
}
