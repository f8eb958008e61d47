//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! callguard.toml (optional)
//!     → loader.rs (parse & deserialize, apply OLLAMA_URL / OLLAMA_HOST)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → breakers and timeout guards built from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breaker state is never persisted
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    BreakerConfig, BreakersConfig, GuardConfig, ModelConfig, ObservabilityConfig, ProbeConfig, TimeoutConfig,
};
pub use validation::ValidationError;
