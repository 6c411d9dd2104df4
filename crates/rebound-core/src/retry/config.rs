//! Retry configuration
//!
//! `RetryConfig<E>` holds everything one retry invocation needs. It is built
//! by applying option functions (see [`super::options`]) in order to the
//! defaults returned by [`RetryConfig::new`].

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::delay::{back_off_delay, combine_delay, random_delay, DelayFn};
use super::observer::{NoOpObserver, RetryObserver};
use super::options::RetryOption;
use super::predicate::{IsRecoverable, RetryPredicate};
use super::timer::{Timer, TokioTimer};

/// Default attempt budget
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Default base delay
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Default upper bound for random jitter
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(100);

/// Matches errors against a per-error attempt budget
pub(crate) type ErrorMatcher<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// An attempt cap that applies only to errors accepted by `matcher`
pub(crate) struct ErrorBudget<E> {
    pub(crate) matcher: ErrorMatcher<E>,
    pub(crate) attempts: u32,
}

/// Configuration for a retry invocation
///
/// Fields are read-only from the outside; use option functions or
/// [`super::RetrierBuilder`] to change them.
pub struct RetryConfig<E> {
    pub(crate) attempts: u32,
    pub(crate) attempts_for_error: Vec<ErrorBudget<E>>,
    pub(crate) delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) max_jitter: Duration,
    pub(crate) delay_type: DelayFn<E>,
    pub(crate) retry_if: Arc<dyn RetryPredicate<E>>,
    pub(crate) on_retry: Arc<dyn RetryObserver<E>>,
    pub(crate) last_error_only: bool,
    pub(crate) cancel: CancellationToken,
    pub(crate) timer: Arc<dyn Timer>,
    pub(crate) wrap_cancel_error_with_last_error: bool,

    /// Shift ceiling for `back_off_delay`, set on first use
    pub(crate) max_backoff_shift: OnceLock<u32>,
}

impl<E: 'static> RetryConfig<E> {
    /// Create a configuration with default settings
    ///
    /// - 10 attempts
    /// - 100ms base delay, no maximum delay
    /// - 100ms maximum jitter
    /// - exponential backoff plus random jitter
    /// - retry everything except unrecoverable errors
    /// - keep the full error history
    /// - never cancelled, real tokio timer
    pub fn new() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            attempts_for_error: Vec::new(),
            delay: DEFAULT_DELAY,
            max_delay: Duration::ZERO,
            max_jitter: DEFAULT_MAX_JITTER,
            delay_type: combine_delay(vec![
                Arc::new(back_off_delay::<E>) as DelayFn<E>,
                Arc::new(random_delay::<E>),
            ]),
            retry_if: Arc::new(IsRecoverable),
            on_retry: Arc::new(NoOpObserver),
            last_error_only: false,
            cancel: CancellationToken::new(),
            timer: Arc::new(TokioTimer),
            wrap_cancel_error_with_last_error: false,
            max_backoff_shift: OnceLock::new(),
        }
    }

    /// Build a configuration by applying `options` to the defaults, in order
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = RetryOption<E>>,
    {
        let mut config = Self::new();
        for option in options {
            option(&mut config);
        }
        config
    }
}

impl<E: 'static> Default for RetryConfig<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfig<E> {
    /// Maximum number of attempts; 0 means retry until success
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Base delay used by the delay policies
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Ceiling applied to every computed delay; zero means no ceiling
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Upper bound (exclusive) for `random_delay`
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Whether only the last error is returned instead of the full history
    pub fn last_error_only(&self) -> bool {
        self.last_error_only
    }

    /// Whether a cancellation outcome carries the last operation error
    pub fn wraps_cancel_error_with_last_error(&self) -> bool {
        self.wrap_cancel_error_with_last_error
    }

    /// The cancellation token raced against every delay
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Number of registered per-error attempt budgets
    pub fn error_budgets(&self) -> usize {
        self.attempts_for_error.len()
    }

    /// The backoff shift ceiling, once `back_off_delay` has computed it
    pub fn max_backoff_shift(&self) -> Option<u32> {
        self.max_backoff_shift.get().copied()
    }
}

impl<E> fmt::Debug for RetryConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("attempts", &self.attempts)
            .field("attempts_for_error", &self.attempts_for_error.len())
            .field("delay", &self.delay)
            .field("max_delay", &self.max_delay)
            .field("max_jitter", &self.max_jitter)
            .field("last_error_only", &self.last_error_only)
            .field("cancelled", &self.cancel.is_cancelled())
            .field(
                "wrap_cancel_error_with_last_error",
                &self.wrap_cancel_error_with_last_error,
            )
            .field("max_backoff_shift", &self.max_backoff_shift.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::options::{attempts, attempts_for_error, delay, last_error_only};
    use chrono::TimeDelta;

    #[test]
    fn test_defaults() {
        let config: RetryConfig<String> = RetryConfig::new();

        assert_eq!(config.attempts(), 10);
        assert_eq!(config.delay(), Duration::from_millis(100));
        assert_eq!(config.max_delay(), Duration::ZERO);
        assert_eq!(config.max_jitter(), Duration::from_millis(100));
        assert!(!config.last_error_only());
        assert!(!config.wraps_cancel_error_with_last_error());
        assert!(!config.cancel_token().is_cancelled());
        assert_eq!(config.error_budgets(), 0);
        assert_eq!(config.max_backoff_shift(), None);
    }

    #[test]
    fn test_default_delay_is_backoff_plus_jitter() {
        let config: RetryConfig<String> = RetryConfig::new();
        let err = "e".to_string();

        for attempt in 0..4 {
            let delay = (config.delay_type)(attempt, &err, &config);
            let base = TimeDelta::milliseconds(100_i64 << attempt);
            assert!(delay >= base);
            assert!(delay < base + TimeDelta::milliseconds(100));
        }
    }

    #[test]
    fn test_options_last_write_wins() {
        let config: RetryConfig<String> = RetryConfig::from_options(vec![
            attempts(3),
            delay(Duration::from_secs(1)),
            attempts(7),
            last_error_only(true),
        ]);

        assert_eq!(config.attempts(), 7);
        assert_eq!(config.delay(), Duration::from_secs(1));
        assert!(config.last_error_only());
    }

    #[test]
    fn test_error_budgets_accumulate() {
        let config: RetryConfig<&'static str> = RetryConfig::from_options(vec![
            attempts_for_error(2, "timeout"),
            attempts_for_error(1, "throttled"),
        ]);

        assert_eq!(config.error_budgets(), 2);
    }

    #[test]
    fn test_debug_output() {
        let config: RetryConfig<String> = RetryConfig::new();
        let debug = format!("{:?}", config);

        assert!(debug.contains("RetryConfig"));
        assert!(debug.contains("attempts: 10"));
    }
}
