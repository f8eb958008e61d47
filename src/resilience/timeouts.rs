//! Bounded-time calls.
//!
//! # Responsibilities
//! - Run one operation per call in its own execution context
//! - Return the operation's result or error untouched when it finishes in time
//! - Report `CallTimeoutError` once the bound passes
//!
//! # Design Decisions
//! - Async operations get a fresh tokio task, blocking ones a fresh thread;
//!   neither is reused across calls
//! - Expiry raises a cooperative `CancelSignal` and detaches the task or
//!   thread. Nothing is preempted: an operation that ignores the signal keeps
//!   running (and holding whatever it holds) until it finishes on its own
//! - Panics inside the operation are resumed on the caller

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinError;

use crate::observability::metrics;
use crate::resilience::error::{CallTimeoutError, InvalidGuardConfig};

/// Cooperative cancellation flag handed to a timed operation.
///
/// Raised when the guard gives up waiting, or when the caller drops the
/// guarded call. Operations are free to ignore it.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Non-blocking check, usable from sync and async code.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // A closed channel means the caller went away; treat it the same.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Sending half of a [`CancelSignal`], owned by the guard for one call.
struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelSignal { rx })
    }

    fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Enforces a wall-clock bound on individual calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutGuard {
    bound: Duration,
}

impl TimeoutGuard {
    pub fn new(bound: Duration) -> Result<Self, InvalidGuardConfig> {
        if bound.is_zero() {
            return Err(InvalidGuardConfig::ZeroTimeoutBound);
        }
        Ok(Self { bound })
    }

    pub fn bound(&self) -> Duration {
        self.bound
    }

    /// Run an async operation on its own task, waiting at most `bound`.
    ///
    /// Must be called from within a tokio runtime. On timeout the task is
    /// detached, not aborted.
    ///
    /// If the runtime cancels the task before it finishes (it only does so
    /// while shutting down), the call has no result to hand back and is
    /// reported as a `CallTimeoutError`. The cancellation is logged at warn.
    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<CallTimeoutError> + Send + 'static,
    {
        let (canceller, signal) = Canceller::new();
        let mut task = tokio::spawn(op(signal));
        let outcome = tokio::time::timeout(self.bound, &mut task).await;

        match outcome {
            Ok(joined) => self.settle(joined),
            Err(_) => {
                canceller.cancel();
                drop(task);
                Err(self.expired().into())
            }
        }
    }

    /// Turn a finished task into the call's result.
    fn settle<T, E>(&self, joined: Result<Result<T, E>, JoinError>) -> Result<T, E>
    where
        E: From<CallTimeoutError>,
    {
        match joined {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => panic::resume_unwind(join_err.into_panic()),
            Err(join_err) => {
                tracing::warn!(
                    error = %join_err,
                    bound_ms = self.bound.as_millis() as u64,
                    "Timed task cancelled by runtime before completing"
                );
                Err(CallTimeoutError { bound: self.bound }.into())
            }
        }
    }

    /// Run a blocking operation on a dedicated thread, waiting at most `bound`.
    ///
    /// On timeout the thread is left running; it exits when the operation
    /// returns.
    pub fn run_blocking<F, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(CancelSignal) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<CallTimeoutError> + Send + 'static,
    {
        let (canceller, signal) = Canceller::new();
        let (tx, rx) = mpsc::sync_channel(1);

        thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(signal)));
            let _ = tx.send(outcome);
        });

        match rx.recv_timeout(self.bound) {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(RecvTimeoutError::Timeout) => {
                canceller.cancel();
                Err(self.expired().into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                panic!("timed call worker exited without reporting an outcome")
            }
        }
    }

    fn expired(&self) -> CallTimeoutError {
        tracing::warn!(bound_ms = self.bound.as_millis() as u64, "Call exceeded its time bound");
        metrics::record_timeout();
        CallTimeoutError { bound: self.bound }
    }
}
