// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::GuardBuilder;
use crate::breaker::{CircuitBreaker, CircuitState};
use crate::bulkhead::Bulkhead;
use crate::config::GuardConfig;
use crate::retry::{RetryError, RetryExecutor};
use crate::{GuardContext, GuardError, Recovery, RecoveryInfo};

/// Protects calls to one named dependency with a bulkhead, a circuit breaker and retries.
///
/// Every call goes through the layers in this order:
///
/// 1. [`Bulkhead`]: a permit is acquired, or the call fails with
///    [`GuardError::ResourceExhausted`]. The breaker is not consulted.
/// 2. [`CircuitBreaker`]: the call is admitted, or the permit is released and the call fails with
///    [`GuardError::CircuitOpen`].
/// 3. [`RetryExecutor`]: the operation runs until it succeeds, fails permanently or runs out of
///    attempts.
///
/// The final outcome is recorded on the breaker exactly once per call, however many attempts the
/// retry loop made, and the bulkhead permit is released on every path. A call cancelled through
/// its token records nothing on the breaker.
///
/// Clones share the same breaker and bulkhead.
///
/// # Examples
///
/// ```rust
/// use std::io;
/// use std::time::Duration;
///
/// use bulwark::{CancellationToken, Guard, GuardContext, GuardError, classify_io_error};
/// use tick::Clock;
///
/// # async fn fetch() -> io::Result<String> { Ok(String::new()) }
/// # async fn example(clock: Clock) {
/// let context = GuardContext::new(&clock);
/// let guard = Guard::builder("profile-service", &context)
///     .breaker(|b| b.failure_threshold(3).reset_timeout(Duration::from_secs(30)))
///     .bulkhead(|b| b.capacity(10))
///     .build();
///
/// match guard.execute_with(fetch, classify_io_error, &CancellationToken::new()).await {
///     Ok(profile) => println!("{profile}"),
///     Err(e) if e.is_fail_fast() => println!("serving cached profile: {e}"),
///     Err(e) => println!("request failed: {e}"),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Guard {
    shared: Arc<GuardShared>,
}

#[derive(Debug)]
struct GuardShared {
    name: Cow<'static, str>,
    bulkhead: Bulkhead,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
}

impl Guard {
    /// Starts building a guard for the dependency called `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &GuardContext) -> GuardBuilder {
        GuardBuilder::new(name.into(), context)
    }

    /// Builds a guard from plain configuration.
    #[must_use]
    pub fn from_config(name: impl Into<Cow<'static, str>>, config: &GuardConfig, context: &GuardContext) -> Self {
        Self::builder(name, context).config(config).build()
    }

    pub(super) fn new(name: Cow<'static, str>, bulkhead: Bulkhead, breaker: CircuitBreaker, retry: RetryExecutor) -> Self {
        Self {
            shared: Arc::new(GuardShared {
                name,
                bulkhead,
                breaker,
                retry,
            }),
        }
    }

    /// The dependency name of this guard.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The circuit breaker of this guard.
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.shared.breaker
    }

    /// The bulkhead of this guard.
    #[must_use]
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.shared.bulkhead
    }

    /// The retry executor of this guard.
    #[must_use]
    pub fn retry(&self) -> &RetryExecutor {
        &self.shared.retry
    }

    /// Shorthand for `self.breaker().current_state()`.
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.shared.breaker.current_state()
    }

    /// Runs `operation` through the guard, classifying its errors with their [`Recovery`] implementation.
    ///
    /// # Errors
    ///
    /// See [`execute_with`](Self::execute_with).
    pub async fn execute<T, E, Op, Fut>(&self, operation: Op, cancellation: &CancellationToken) -> Result<T, GuardError<E>>
    where
        E: Recovery,
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(operation, E::recovery, cancellation).await
    }

    /// Runs `operation` through the guard, classifying its errors with `classify`.
    ///
    /// # Errors
    ///
    /// - [`GuardError::ResourceExhausted`] when the bulkhead refused a permit.
    /// - [`GuardError::CircuitOpen`] when the breaker rejected the call.
    /// - [`GuardError::Cancelled`] when `cancellation` fired at any point.
    /// - [`GuardError::Operation`] with the last error when the operation failed permanently or
    ///   ran out of attempts.
    pub async fn execute_with<T, E, Op, Fut, C>(&self, operation: Op, classify: C, cancellation: &CancellationToken) -> Result<T, GuardError<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RecoveryInfo,
    {
        let permit = self.shared.bulkhead.acquire(cancellation).await?;

        let admission = match self.shared.breaker.allow() {
            Ok(admission) => admission,
            Err(rejected) => {
                permit.release();
                return Err(rejected.into());
            }
        };

        let result = self.shared.retry.execute(operation, classify, cancellation).await;

        match &result {
            Ok(_) => admission.record_success(),
            Err(RetryError::Operation(error)) => admission.record(error.recovery()),
            Err(RetryError::Cancelled(_)) => drop(admission),
        }

        permit.release();
        result.map_err(GuardError::from)
    }
}
