//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded call:
//!     → circuit_breaker.rs (fast-fail while open, track consecutive failures)
//!     → timeouts.rs (run on its own task/thread, enforce the wall-clock bound)
//!     → operation
//!     ← result, operation error, CallTimeoutError or CircuitOpenError
//! ```
//!
//! # Design Decisions
//! - Every guarded operation gets its own breaker instance; nothing is global
//! - Guards add error kinds but never swallow or rewrite the operation's own
//! - Cancellation on timeout is cooperative only (see `timeouts.rs`)
//! - Composition is explicit function wrapping (`compose.rs`)

pub mod circuit_breaker;
pub mod compose;
pub mod error;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState, FailurePredicate};
pub use compose::{with_cancellable_timeout, with_circuit_breaker, with_timeout, Guarded};
pub use error::{CallTimeoutError, CircuitOpenError, GuardError, GuardResult, InvalidGuardConfig};
pub use timeouts::{CancelSignal, TimeoutGuard};
