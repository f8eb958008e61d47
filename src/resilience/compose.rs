//! Explicit wrapping of operations with guards.
//!
//! ```text
//! Guarded::from_fn(op)
//!     → with_timeout(.., guard)              bound each call
//!     → with_circuit_breaker(.., breaker)    fast-fail when failing
//! ```
//!
//! Each wrapper takes a `Guarded` and returns a `Guarded` with the same
//! argument and result types, so guards compose as plain function calls.
//! The usual order puts the breaker outermost: a call that hangs turns into
//! a `CallTimeoutError`, which the breaker then counts as one failure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::{CallTimeoutError, CircuitOpenError};
use crate::resilience::timeouts::{CancelSignal, TimeoutGuard};

/// A shareable async operation from `A` to `Result<T, E>`.
///
/// Use a tuple for `A` when the operation takes several arguments, and `()`
/// when it takes none.
pub struct Guarded<A, T, E> {
    inner: Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync>,
}

impl<A, T, E> Guarded<A, T, E>
where
    A: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn from_fn<F, Fut>(op: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |args| op(args).boxed()),
        }
    }

    pub fn call(&self, args: A) -> BoxFuture<'static, Result<T, E>> {
        (self.inner)(args)
    }
}

impl<A, T, E> Clone for Guarded<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, T, E> fmt::Debug for Guarded<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded").finish_non_exhaustive()
    }
}

/// Bound every call of `op` by `guard`.
pub fn with_timeout<A, T, E>(op: Guarded<A, T, E>, guard: TimeoutGuard) -> Guarded<A, T, E>
where
    A: Send + 'static,
    T: Send + 'static,
    E: From<CallTimeoutError> + Send + 'static,
{
    Guarded::from_fn(move |args| {
        let fut = op.call(args);
        async move { guard.run(move |_| fut).await }
    })
}

/// Like [`with_timeout`], for operations that watch the cancel signal.
pub fn with_cancellable_timeout<A, T, E, F, Fut>(op: F, guard: TimeoutGuard) -> Guarded<A, T, E>
where
    A: Send + 'static,
    T: Send + 'static,
    E: From<CallTimeoutError> + Send + 'static,
    F: Fn(A, CancelSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let op = Arc::new(op);
    Guarded::from_fn(move |args| {
        let op = op.clone();
        async move { guard.run(move |cancel| op(args, cancel)).await }
    })
}

/// Route every call of `op` through `breaker`.
pub fn with_circuit_breaker<A, T, E>(op: Guarded<A, T, E>, breaker: Arc<CircuitBreaker<E>>) -> Guarded<A, T, E>
where
    A: Send + 'static,
    T: Send + 'static,
    E: From<CircuitOpenError> + Send + 'static,
{
    Guarded::from_fn(move |args| {
        let op = op.clone();
        let breaker = breaker.clone();
        async move { breaker.call(|| op.call(args)).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitState;
    use crate::resilience::error::GuardError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    type TestError = GuardError<String>;

    #[tokio::test]
    async fn test_arguments_pass_through() {
        let add = Guarded::from_fn(|(a, b): (u32, u32)| async move { Ok::<_, TestError>(a + b) });
        let add = with_timeout(add, TimeoutGuard::new(Duration::from_secs(1)).unwrap());

        assert_eq!(add.call((2, 3)).await.unwrap(), 5);
        assert_eq!(add.clone().call((10, 1)).await.unwrap(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_counts_hung_calls() {
        let attempts = Arc::new(AtomicU32::new(0));
        let hang = Guarded::from_fn({
            let attempts = attempts.clone();
            move |()| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { std::future::pending::<Result<(), TestError>>().await }
            }
        });

        let breaker = Arc::new(CircuitBreaker::new("hang", 2, Duration::from_secs(30)).unwrap());
        let guarded = with_circuit_breaker(
            with_timeout(hang, TimeoutGuard::new(Duration::from_secs(2)).unwrap()),
            breaker.clone(),
        );

        assert!(matches!(guarded.call(()).await, Err(GuardError::Timeout(_))));
        assert_eq!(breaker.snapshot().consecutive_failures, 1);
        assert!(matches!(guarded.call(()).await, Err(GuardError::Timeout(_))));
        assert_eq!(breaker.state(), CircuitState::Open);

        // Open: no further timed attempts are made.
        assert!(matches!(guarded.call(()).await, Err(GuardError::CircuitOpen(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_timeout_hands_out_signal() {
        let observed = Arc::new(AtomicU32::new(0));
        let op = with_cancellable_timeout(
            {
                let observed = observed.clone();
                move |(), cancel: CancelSignal| {
                    let observed = observed.clone();
                    async move {
                        cancel.cancelled().await;
                        observed.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), TestError>(())
                    }
                }
            },
            TimeoutGuard::new(Duration::from_millis(100)).unwrap(),
        );

        assert!(matches!(op.call(()).await, Err(GuardError::Timeout(_))));
        tokio::task::yield_now().await;
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }
}
