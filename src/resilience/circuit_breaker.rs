//! Circuit breaker for a single guarded operation.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: operation assumed down, calls fail fast
//! - Half-Open: one trial call decides whether to close or re-open
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive counted failures >= failure_threshold
//! Open → Half-Open: recovery_timeout elapsed, checked lazily on the next call
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (counted failure)
//! ```
//!
//! # Design Decisions
//! - One breaker per guarded operation, shared through `Arc`
//! - State lives behind a single mutex that is never held while the
//!   operation runs
//! - No background timer; the open period is evaluated at call time
//! - Half-Open admits a single trial at a time; a trial that is dropped
//!   mid-flight hands its slot back

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::error::{CircuitOpenError, InvalidGuardConfig};

/// Circuit state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Decides whether an error counts against the breaker.
pub type FailurePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Point-in-time view of a breaker, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Trial,
}

/// Circuit breaker guarding one logical operation.
///
/// `E` is the error type of the guarded operation. Rejections are reported
/// through `E: From<CircuitOpenError>`, so the caller sees one error type.
pub struct CircuitBreaker<E> {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    is_failure: FailurePredicate<E>,
    inner: Mutex<BreakerState>,
}

impl<E: 'static> CircuitBreaker<E> {
    /// Create a breaker that counts every error as a failure.
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        recovery_timeout: Duration,
    ) -> Result<Self, InvalidGuardConfig> {
        if failure_threshold == 0 {
            return Err(InvalidGuardConfig::ZeroFailureThreshold);
        }

        let name = name.into();
        metrics::record_circuit_state(&name, CircuitState::Closed);

        Ok(Self {
            name,
            failure_threshold,
            recovery_timeout,
            is_failure: Arc::new(|_: &E| true),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        })
    }

    /// Create a breaker from its configuration section.
    pub fn from_config(name: impl Into<String>, config: &BreakerConfig) -> Result<Self, InvalidGuardConfig> {
        Self::new(name, config.failure_threshold, config.recovery_timeout())
    }

    /// Only errors matching `predicate` count as failures; the rest pass
    /// through without touching breaker state.
    pub fn with_failure_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.is_failure = Arc::new(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// Current state, without evaluating the lazy Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
        }
    }

    /// Run an async operation under the breaker.
    ///
    /// The operation is only constructed and polled when the breaker admits
    /// the call. Its error is returned unchanged.
    ///
    /// While a half-open trial is running, other callers are rejected with
    /// `retry_after` set to the full recovery timeout, since the trial's
    /// outcome is not known yet. A trial that is not itself bounded by a
    /// timeout keeps the slot for as long as it runs.
    pub async fn call<F, Fut, T>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        let admission = self.admit()?;
        let mut permit = TrialPermit::new(self, admission);
        let started = Instant::now();

        let result = op().await;

        permit.release();
        self.record(&result, admission, started.elapsed());
        result
    }

    /// Blocking counterpart of [`CircuitBreaker::call`].
    pub fn call_blocking<F, T>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<CircuitOpenError>,
    {
        let admission = self.admit()?;
        let mut permit = TrialPermit::new(self, admission);
        let started = Instant::now();

        let result = op();

        permit.release();
        self.record(&result, admission, started.elapsed());
        result
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Bookkeeping never panics half-way, so a poisoned lock still holds
        // consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Result<Admission, CircuitOpenError> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            let now = Instant::now();
            let elapsed = inner
                .opened_at
                .map(|at| now.saturating_duration_since(at))
                .unwrap_or(self.recovery_timeout);

            if elapsed < self.recovery_timeout {
                drop(inner);
                return Err(self.reject(self.recovery_timeout - elapsed));
            }

            inner.state = CircuitState::HalfOpen;
            tracing::info!(breaker = %self.name, "Circuit half-open, admitting trial call");
            metrics::record_circuit_state(&self.name, CircuitState::HalfOpen);
        }

        if inner.state == CircuitState::HalfOpen {
            if inner.trial_in_flight {
                drop(inner);
                return Err(self.reject(self.recovery_timeout));
            }
            inner.trial_in_flight = true;
            return Ok(Admission::Trial);
        }

        Ok(Admission::Normal)
    }

    fn reject(&self, retry_after: Duration) -> CircuitOpenError {
        tracing::debug!(breaker = %self.name, retry_after = ?retry_after, "Call rejected, circuit open");
        metrics::record_call(&self.name, "rejected");
        CircuitOpenError {
            breaker: self.name.clone(),
            retry_after,
        }
    }

    fn record<T>(&self, result: &Result<T, E>, admission: Admission, elapsed: Duration) {
        metrics::record_call_duration(&self.name, elapsed);

        let mut inner = self.lock();
        if admission == Admission::Trial {
            inner.trial_in_flight = false;
        }

        match result {
            Ok(_) => {
                metrics::record_call(&self.name, "success");
                inner.consecutive_failures = 0;
                if inner.state != CircuitState::Closed {
                    inner.state = CircuitState::Closed;
                    inner.opened_at = None;
                    tracing::info!(breaker = %self.name, "Circuit closed");
                    metrics::record_circuit_state(&self.name, CircuitState::Closed);
                }
            }
            Err(err) if (self.is_failure)(err) => {
                metrics::record_call(&self.name, "failure");
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

                let trial_failed = inner.state == CircuitState::HalfOpen;
                if trial_failed || inner.consecutive_failures >= self.failure_threshold {
                    inner.consecutive_failures = inner.consecutive_failures.max(self.failure_threshold);
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        breaker = %self.name,
                        consecutive_failures = inner.consecutive_failures,
                        trial_failed,
                        recovery_timeout = ?self.recovery_timeout,
                        "Circuit opened"
                    );
                    metrics::record_circuit_state(&self.name, CircuitState::Open);
                }
            }
            Err(_) => {
                metrics::record_call(&self.name, "ignored");
            }
        }
    }
}

impl<E> fmt::Debug for CircuitBreaker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("failure_threshold", &self.failure_threshold)
            .field("recovery_timeout", &self.recovery_timeout)
            .finish_non_exhaustive()
    }
}

/// Holds the half-open trial slot while a trial call runs.
///
/// If the call future is dropped (or the operation panics) before an
/// outcome is recorded, dropping the permit frees the slot so the breaker
/// does not stay wedged in Half-Open.
struct TrialPermit<'a, E: 'static> {
    breaker: &'a CircuitBreaker<E>,
    held: bool,
}

impl<'a, E: 'static> TrialPermit<'a, E> {
    fn new(breaker: &'a CircuitBreaker<E>, admission: Admission) -> Self {
        Self {
            breaker,
            held: admission == Admission::Trial,
        }
    }

    fn release(&mut self) {
        self.held = false;
    }
}

impl<E: 'static> Drop for TrialPermit<'_, E> {
    fn drop(&mut self) {
        if self.held {
            self.breaker.lock().trial_in_flight = false;
            tracing::debug!(breaker = %self.breaker.name, "Trial call abandoned");
        }
    }
}
