//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GuardConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration for the binary.
///
/// An explicit `path` must exist. Without one, `callguard.toml` in the
/// working directory is used if present, defaults otherwise. Environment
/// overrides are applied before validation.
pub fn load(path: Option<&Path>) -> Result<GuardConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => parse_file(Path::new(DEFAULT_CONFIG_PATH))?,
        None => GuardConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

pub const DEFAULT_CONFIG_PATH: &str = "callguard.toml";

fn parse_file(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `OLLAMA_URL` (preferred) or `OLLAMA_HOST` as the model base URL.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = ["OLLAMA_URL", "OLLAMA_HOST"].into_iter().find_map(|key| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| (key, value))
    });

    if let Some((key, value)) = from_env {
        let url = normalize_base_url(&value);
        tracing::info!(source = key, base_url = %url, "Using model base URL from environment");
        config.model.base_url = Some(url);
    }
}

/// Bare `host:port` values (as `OLLAMA_HOST` usually holds) get `http://`.
pub fn normalize_base_url(value: &str) -> String {
    let value = value.trim_end_matches('/');
    if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{}", value)
    }
}
