//! Retry execution engine with option-based configuration
//!
//! This module runs a fallible async operation repeatedly until it succeeds,
//! its attempt budget is used up, the failure is deemed not worth retrying,
//! or a cancellation token fires while waiting between attempts.
//!
//! # Features
//!
//! - Pluggable delay policies: fixed, exponential backoff, random jitter and
//!   any sum of them via `combine_delay`
//! - Global and per-error attempt budgets, or unbounded retries
//! - Errors marked with `unrecoverable` stop the loop immediately
//! - Full per-attempt error history or last-error-only reporting
//! - Observable retries via the `RetryObserver` trait, with a built-in
//!   `TracingObserver` for logging
//! - Cancellation through `tokio_util::sync::CancellationToken`
//! - Swappable `Timer` for deterministic tests
//!
//! # Example
//!
//! ```rust,no_run
//! use rebound_core::retry::{attempts, delay, retry_with, AttemptError, RetryError};
//! use std::time::Duration;
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     retry_with(
//!         vec![attempts(5), delay(Duration::from_millis(250))],
//!         || async {
//!             // Your fallible operation here
//!             Ok::<_, AttemptError<std::io::Error>>("success".to_string())
//!         },
//!     )
//!     .await
//! }
//! ```

mod attempt;
mod config;
mod delay;
mod error;
mod executor;
mod observer;
mod options;
mod predicate;
mod timer;

pub use attempt::{is_recoverable, unrecoverable, AttemptError};
pub use config::{RetryConfig, DEFAULT_ATTEMPTS, DEFAULT_DELAY, DEFAULT_MAX_JITTER};
pub use delay::{back_off_delay, combine_delay, fixed_delay, random_delay, DelayFn};
pub use error::{Cancelled, ErrorHistory, Failure, RetryError, HISTORY_HEADER};
pub use executor::{retry, retry_with, Retrier, RetrierBuilder};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use options::{
    attempts, attempts_for_error, attempts_for_error_matching, cancel_token, delay, delay_type,
    last_error_only, max_delay, max_jitter, on_retry, retry_if, with_timer,
    wrap_cancel_error_with_last_error, RetryOption,
};
pub use predicate::{IsRecoverable, RetryPredicate};
pub use timer::{Timer, TokioTimer};
