//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML, and every
//! section has defaults so an empty file (or no file) is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Local model server detection.
    pub probe: ProbeConfig,

    /// Model endpoint and generation options.
    pub model: ModelConfig,

    /// One breaker per guarded operation.
    pub breakers: BreakersConfig,

    /// Wall-clock bounds per guarded operation.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Local service probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Probe for a local server when no base URL is configured.
    pub enabled: bool,

    /// Scheme and host, e.g. "http://localhost".
    pub host: String,

    pub port: u16,

    /// Paths tried in order; the first that answers wins.
    pub paths: Vec<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: f64,
}

impl ProbeConfig {
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "http://localhost".to_string(),
            port: 11434,
            paths: vec!["/v1/models".to_string(), "/ping".to_string(), "/".to_string()],
            request_timeout_secs: 1.5,
        }
    }
}

/// Model endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Explicit base URL. Overridden by `OLLAMA_URL` / `OLLAMA_HOST`.
    pub base_url: Option<String>,

    /// Used when nothing is configured and the probe finds nothing.
    pub fallback_url: String,

    /// Model tag, e.g. "gemma3:latest".
    pub model: String,

    pub temperature: f32,

    /// Context window in tokens.
    pub num_ctx: u32,

    /// Maximum tokens to generate.
    pub num_predict: u32,

    /// How long the server keeps the model loaded, e.g. "30m".
    pub keep_alive: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fallback_url: "http://localhost:11434".to_string(),
            model: "gemma3:latest".to_string(),
            temperature: 0.0,
            num_ctx: 16384,
            num_predict: 512,
            keep_alive: "30m".to_string(),
        }
    }
}

/// Breaker settings for each guarded operation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakersConfig {
    pub probe: BreakerConfig,
    pub model: BreakerConfig,
}

impl Default for BreakersConfig {
    fn default() -> Self {
        Self {
            probe: BreakerConfig {
                failure_threshold: 3,
                recovery_timeout_secs: 20.0,
            },
            model: BreakerConfig {
                failure_threshold: 2,
                recovery_timeout_secs: 30.0,
            },
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive counted failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a trial call.
    pub recovery_timeout_secs: f64,
}

impl BreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        secs(self.recovery_timeout_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 30.0,
        }
    }
}

/// Timeout configuration for the guarded operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on the whole probe (all candidate paths), in seconds.
    pub probe_secs: f64,

    /// Bound on a single model invocation, in seconds.
    pub model_secs: f64,
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        secs(self.probe_secs)
    }

    pub fn model(&self) -> Duration {
        secs(self.model_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 2.0,
            model_secs: 20.0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

// Invalid values are caught by validation; this only has to not panic.
// Values too large for a Duration saturate instead of wrapping to zero.
fn secs(value: f64) -> Duration {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) => duration,
        Err(_) if value > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}
