//! Retry execution engine
//!
//! This module provides the core retry loop. Each invocation runs the
//! operation until it succeeds, the attempt budget (total or per error) is
//! spent, the predicate rejects the error, or the cancellation token fires
//! during a wait.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::attempt::AttemptError;
use super::config::RetryConfig;
use super::delay::{next_delay, DelayFn};
use super::error::{Cancelled, ErrorHistory, Failure, RetryError};
use super::observer::RetryObserver;
use super::options::{self, RetryOption};
use super::predicate::RetryPredicate;
use super::timer::Timer;
use crate::types::RetryPolicy;

/// Why the loop stopped without a success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    ExhaustedAttempts,
    ExhaustedErrorBudget,
    Unrecoverable,
    PredicateRejected,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::ExhaustedAttempts => "attempts exhausted",
            StopReason::ExhaustedErrorBudget => "attempts for error exhausted",
            StopReason::Unrecoverable => "unrecoverable error",
            StopReason::PredicateRejected => "retry predicate rejected error",
        };
        f.write_str(reason)
    }
}

/// Run an operation with the default configuration
///
/// Ten attempts, exponential backoff from 100ms plus up to 100ms of jitter,
/// full error history.
///
/// # Example
///
/// ```rust,no_run
/// use rebound_core::retry::{retry, AttemptError, RetryError};
///
/// async fn example() -> Result<String, RetryError<std::io::Error>> {
///     retry(|| async {
///         // Your fallible operation here; `?` marks errors as transient
///         let body = std::fs::read_to_string("/etc/hostname")?;
///         Ok::<_, AttemptError<std::io::Error>>(body)
///     })
///     .await
/// }
/// ```
pub async fn retry<F, Fut, T, E>(op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
    E: 'static,
{
    Retrier::new().execute(op).await
}

/// Run an operation with the given options applied to the defaults
///
/// # Example
///
/// ```rust,no_run
/// use rebound_core::retry::{attempts, delay, retry_with, unrecoverable};
/// use std::time::Duration;
///
/// async fn example() {
///     let result = retry_with(
///         vec![attempts(3), delay(Duration::from_millis(10))],
///         || async {
///             Err::<(), _>(unrecoverable(std::io::Error::other("bad request")))
///         },
///     )
///     .await;
///     assert!(result.is_err());
/// }
/// ```
pub async fn retry_with<I, F, Fut, T, E>(options: I, op: F) -> Result<T, RetryError<E>>
where
    I: IntoIterator<Item = RetryOption<E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
    E: 'static,
{
    Retrier::from_options(options).execute(op).await
}

/// Builder for configuring a `Retrier`
///
/// Every setter queues an option; `build` applies them in order, so the last
/// value written wins for scalar settings while per-error budgets add up.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{RetrierBuilder, TracingObserver};
/// use std::time::Duration;
///
/// let retrier = RetrierBuilder::<std::io::Error>::new()
///     .attempts(5)
///     .delay(Duration::from_millis(200))
///     .max_delay(Duration::from_secs(5))
///     .on_retry(TracingObserver::new("download"))
///     .build();
/// assert_eq!(retrier.config().attempts(), 5);
/// ```
pub struct RetrierBuilder<E> {
    options: Vec<RetryOption<E>>,
}

impl<E: 'static> Default for RetrierBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> RetrierBuilder<E> {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
        }
    }

    /// Queue an arbitrary option
    pub fn option(mut self, option: RetryOption<E>) -> Self {
        self.options.push(option);
        self
    }

    /// Set the attempt budget; 0 retries until success
    pub fn attempts(self, attempts: u32) -> Self {
        self.option(options::attempts(attempts))
    }

    /// Cap the attempts that may fail with `err`
    pub fn attempts_for_error(self, attempts: u32, err: E) -> Self
    where
        E: PartialEq + Send + Sync,
    {
        self.option(options::attempts_for_error(attempts, err))
    }

    /// Cap the attempts that fail with an error accepted by `matcher`
    pub fn attempts_for_error_matching<F>(self, attempts: u32, matcher: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.option(options::attempts_for_error_matching(attempts, matcher))
    }

    /// Set the base delay
    pub fn delay(self, delay: Duration) -> Self {
        self.option(options::delay(delay))
    }

    /// Set the delay ceiling
    pub fn max_delay(self, max_delay: Duration) -> Self {
        self.option(options::max_delay(max_delay))
    }

    /// Set the jitter bound
    pub fn max_jitter(self, max_jitter: Duration) -> Self {
        self.option(options::max_jitter(max_jitter))
    }

    /// Set the delay policy
    pub fn delay_type(self, delay_type: DelayFn<E>) -> Self {
        self.option(options::delay_type(delay_type))
    }

    /// Set the retry predicate
    pub fn retry_if<P>(self, predicate: P) -> Self
    where
        P: RetryPredicate<E> + 'static,
    {
        self.option(options::retry_if(predicate))
    }

    /// Set the on-retry observer
    pub fn on_retry<O>(self, observer: O) -> Self
    where
        O: RetryObserver<E> + 'static,
    {
        self.option(options::on_retry(observer))
    }

    /// Return only the last error
    pub fn last_error_only(self, last_error_only: bool) -> Self {
        self.option(options::last_error_only(last_error_only))
    }

    /// Set the cancellation token
    pub fn cancel_token(self, token: CancellationToken) -> Self {
        self.option(options::cancel_token(token))
    }

    /// Replace the timer
    pub fn with_timer<T>(self, timer: T) -> Self
    where
        T: Timer + 'static,
    {
        self.option(options::with_timer(timer))
    }

    /// Chain the cancellation error with the last operation error
    pub fn wrap_cancel_error_with_last_error(self, wrap: bool) -> Self {
        self.option(options::wrap_cancel_error_with_last_error(wrap))
    }

    /// Build the retrier
    pub fn build(self) -> Retrier<E> {
        Retrier::from_options(self.options)
    }
}

/// A configured retry loop
///
/// A `Retrier` can run any number of operations; every call to `execute`
/// starts with a fresh history and fresh per-error budgets.
#[derive(Debug)]
pub struct Retrier<E> {
    config: RetryConfig<E>,
}

impl<E: 'static> Default for Retrier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Retrier<E> {
    /// Create a retrier with the default configuration
    pub fn new() -> Self {
        Self {
            config: RetryConfig::new(),
        }
    }

    /// Create a retrier by applying `options` to the defaults
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = RetryOption<E>>,
    {
        Self {
            config: RetryConfig::from_options(options),
        }
    }

    /// Create a retrier from a declarative policy
    ///
    /// # Example
    ///
    /// ```rust
    /// use rebound_core::retry::Retrier;
    /// use rebound_core::types::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 3,
    ///     ..Default::default()
    /// };
    /// let retrier = Retrier::<std::io::Error>::from_policy(&policy);
    /// assert_eq!(retrier.config().attempts(), 3);
    /// ```
    pub fn from_policy(policy: &RetryPolicy) -> Self {
        Self::from_options(policy.options())
    }

    /// Start building a retrier
    pub fn builder() -> RetrierBuilder<E> {
        RetrierBuilder::new()
    }
}

impl<E> Retrier<E> {
    /// Wrap an existing configuration
    pub fn with_config(config: RetryConfig<E>) -> Self {
        Self { config }
    }

    /// The configuration used by every invocation
    pub fn config(&self) -> &RetryConfig<E> {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// # Arguments
    ///
    /// * `op` - A closure that returns a future representing one attempt
    ///
    /// # Returns
    ///
    /// The value of the first successful attempt, or a `RetryError`
    /// describing why the loop gave up.
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
    {
        let config = &self.config;

        if config.cancel.is_cancelled() {
            tracing::debug!("retry cancelled before the first attempt");
            return Err(RetryError::Cancelled(Cancelled));
        }

        // An unbounded loop keeps a single slot so memory stays flat.
        let bounded = config.attempts > 0;
        let keep_history = bounded && !config.last_error_only;

        let mut history = ErrorHistory::new();
        let mut remaining: Vec<u32> = config
            .attempts_for_error
            .iter()
            .map(|budget| budget.attempts)
            .collect();
        let mut attempt: u32 = 0;

        loop {
            let err = match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let recoverable = err.is_recoverable();
            let should_retry = config.retry_if.should_retry(&err) && recoverable;
            let error = err.into_inner();

            let stop = if !should_retry {
                Some(if recoverable {
                    StopReason::PredicateRejected
                } else {
                    StopReason::Unrecoverable
                })
            } else if bounded && attempt == config.attempts - 1 {
                // No observer call and no wait: nothing follows this attempt.
                Some(StopReason::ExhaustedAttempts)
            } else {
                config.on_retry.on_retry(attempt, &error);
                self.consume_error_budgets(&mut remaining, &error)
                    .then_some(StopReason::ExhaustedErrorBudget)
            };

            if let Some(reason) = stop {
                tracing::debug!(attempt, reason = %reason, "retry stopped");
                if !keep_history {
                    return Err(RetryError::LastError(error));
                }
                history.record(attempt as usize, Failure::Operation(error));
                return Err(RetryError::Failed(history));
            }

            let wait = next_delay(attempt, &error, config);
            let slot = if keep_history { attempt as usize } else { 0 };
            history.record(slot, Failure::Operation(error));

            tracing::trace!(attempt, delay_ms = wait.as_millis() as u64, "waiting before retry");

            tokio::select! {
                _ = config.timer.after(wait) => {}
                _ = config.cancel.cancelled() => {
                    tracing::debug!(attempt, "retry cancelled while waiting");
                    return Err(self.cancelled(history, attempt, keep_history));
                }
            }

            attempt = attempt.saturating_add(1);
        }
    }

    /// Decrement every budget whose matcher accepts `error`; true once any of
    /// them reaches zero
    fn consume_error_budgets(&self, remaining: &mut [u32], error: &E) -> bool {
        let mut exhausted = false;
        for (budget, left) in self.config.attempts_for_error.iter().zip(remaining) {
            if (budget.matcher)(error) {
                *left = left.saturating_sub(1);
                exhausted |= *left == 0;
            }
        }
        exhausted
    }

    fn cancelled(&self, mut history: ErrorHistory<E>, attempt: u32, keep_history: bool) -> RetryError<E> {
        if keep_history {
            history.record(attempt as usize + 1, Failure::Cancelled(Cancelled));
            return RetryError::Failed(history);
        }

        if self.config.wrap_cancel_error_with_last_error {
            if let Some(Failure::Operation(last_error)) = history.into_last_error() {
                return RetryError::CancelledWithLastError {
                    cancelled: Cancelled,
                    last_error,
                };
            }
        }

        RetryError::Cancelled(Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::attempt::unrecoverable;
    use crate::retry::observer::StatsObserver;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick() -> RetrierBuilder<io::Error> {
        RetrierBuilder::new()
            .delay(Duration::from_millis(1))
            .max_jitter(Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success() {
        let observer = StatsObserver::new();

        let result = quick()
            .on_retry(observer.clone())
            .build()
            .execute(|| async { Ok("success") })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(observer.retries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retry() {
        let observer = StatsObserver::new();
        let calls = Arc::new(AtomicU32::new(0));

        let result = quick()
            .attempts(3)
            .on_retry(observer.clone())
            .build()
            .execute(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "timeout").into());
                    }
                    Ok("success")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(observer.attempts(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt() {
        let observer = StatsObserver::new();

        let result: Result<(), _> = quick()
            .attempts(1)
            .on_retry(observer.clone())
            .build()
            .execute(|| async { Err(io::Error::other("error").into()) })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.history().map(ErrorHistory::len), Some(1));
        assert_eq!(observer.retries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecoverable_stops_with_custom_predicate() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = quick()
            .attempts(5)
            .retry_if(|_: &AttemptError<io::Error>| true)
            .build()
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(unrecoverable(io::Error::other("fatal")))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_consume_error_budgets() {
        let retrier = Retrier::from_options(vec![
            options::attempts_for_error(2, "busy"),
            options::attempts_for_error_matching(3, |err: &&str| err.starts_with('b')),
        ]);
        let mut remaining = vec![2, 3];

        assert!(!retrier.consume_error_budgets(&mut remaining, &"idle"));
        assert_eq!(remaining, vec![2, 3]);
        assert!(!retrier.consume_error_budgets(&mut remaining, &"busy"));
        assert!(retrier.consume_error_budgets(&mut remaining, &"busy"));
        assert_eq!(remaining, vec![0, 1]);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(
            StopReason::ExhaustedAttempts.to_string(),
            "attempts exhausted"
        );
        assert_eq!(
            StopReason::Unrecoverable.to_string(),
            "unrecoverable error"
        );
    }
}
