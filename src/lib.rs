//! Circuit breaker and timeout guards for calls to unreliable services.

pub mod app;
pub mod config;
pub mod model;
pub mod observability;
pub mod probe;
pub mod resilience;

pub use app::{fallback_message, App, AppError};
pub use config::schema::GuardConfig;
pub use resilience::{
    with_circuit_breaker, with_timeout, CallTimeoutError, CircuitBreaker, CircuitOpenError, CircuitState, GuardError,
    Guarded, TimeoutGuard,
};
