//! Option functions for building a `RetryConfig`
//!
//! Each function returns a [`RetryOption`], a small mutator applied to the
//! default configuration. Options are applied in order: scalar settings take
//! the last value written, per-error budgets accumulate.
//!
//! # Example
//!
//! ```rust
//! use rebound_core::retry::{attempts, delay, last_error_only, RetryConfig};
//! use std::time::Duration;
//!
//! let config: RetryConfig<std::io::Error> = RetryConfig::from_options(vec![
//!     attempts(5),
//!     delay(Duration::from_millis(50)),
//!     last_error_only(true),
//! ]);
//! assert_eq!(config.attempts(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::{ErrorBudget, RetryConfig};
use super::delay::DelayFn;
use super::observer::RetryObserver;
use super::predicate::RetryPredicate;
use super::timer::Timer;

/// A configuration mutator
pub type RetryOption<E> = Box<dyn FnOnce(&mut RetryConfig<E>) + Send>;

/// Set the attempt budget; 0 retries until the operation succeeds
///
/// Default: 10.
pub fn attempts<E: 'static>(attempts: u32) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.attempts = attempts)
}

/// Cap the number of attempts that may fail with `err`
///
/// Attempts counted here also count against the total budget; the loop
/// stops as soon as either is used up. Calling this several times registers
/// several budgets.
pub fn attempts_for_error<E>(attempts: u32, err: E) -> RetryOption<E>
where
    E: PartialEq + Send + Sync + 'static,
{
    attempts_for_error_matching(attempts, move |candidate: &E| *candidate == err)
}

/// Cap the number of attempts that fail with an error accepted by `matcher`
pub fn attempts_for_error_matching<E, F>(attempts: u32, matcher: F) -> RetryOption<E>
where
    E: 'static,
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    Box::new(move |config: &mut RetryConfig<E>| {
        config.attempts_for_error.push(ErrorBudget {
            matcher: Arc::new(matcher),
            attempts,
        })
    })
}

/// Set the base delay between attempts
///
/// Default: 100ms.
pub fn delay<E: 'static>(delay: Duration) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.delay = delay)
}

/// Set the ceiling for every computed delay
///
/// Default: zero, meaning no ceiling.
pub fn max_delay<E: 'static>(max_delay: Duration) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.max_delay = max_delay)
}

/// Set the exclusive upper bound used by `random_delay`
///
/// Default: 100ms.
pub fn max_jitter<E: 'static>(max_jitter: Duration) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.max_jitter = max_jitter)
}

/// Choose the delay policy
///
/// Default: `back_off_delay` combined with `random_delay`.
pub fn delay_type<E: 'static>(delay_type: DelayFn<E>) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.delay_type = delay_type)
}

/// Decide which failures are retried
///
/// Default: [`super::IsRecoverable`], which retries everything except
/// errors wrapped with [`super::unrecoverable`].
pub fn retry_if<E, P>(predicate: P) -> RetryOption<E>
where
    E: 'static,
    P: RetryPredicate<E> + 'static,
{
    Box::new(move |config: &mut RetryConfig<E>| config.retry_if = Arc::new(predicate))
}

/// Register a callback invoked before every retry
pub fn on_retry<E, O>(observer: O) -> RetryOption<E>
where
    E: 'static,
    O: RetryObserver<E> + 'static,
{
    Box::new(move |config: &mut RetryConfig<E>| config.on_retry = Arc::new(observer))
}

/// Return only the last error instead of the full history
///
/// Default: false.
pub fn last_error_only<E: 'static>(last_error_only: bool) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.last_error_only = last_error_only)
}

/// Stop retrying once `token` is cancelled
pub fn cancel_token<E: 'static>(token: CancellationToken) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.cancel = token)
}

/// Replace the timer used for the inter-attempt wait
pub fn with_timer<E, T>(timer: T) -> RetryOption<E>
where
    E: 'static,
    T: Timer + 'static,
{
    Box::new(move |config: &mut RetryConfig<E>| config.timer = Arc::new(timer))
}

/// Return the cancellation error chained with the last operation error
///
/// Applies when the history is not kept (last-error-only or unbounded
/// attempts); a full history already holds both. Default: false.
pub fn wrap_cancel_error_with_last_error<E: 'static>(wrap: bool) -> RetryOption<E> {
    Box::new(move |config: &mut RetryConfig<E>| config.wrap_cancel_error_with_last_error = wrap)
}
