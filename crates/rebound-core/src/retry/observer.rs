//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait, called each time the
//! executor is about to retry, and a `TracingObserver` implementation that
//! logs using the `tracing` crate.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Observer for retry events
///
/// `on_retry` fires only when another attempt will actually be made. The
/// final failure that ends the loop is never reported here.
///
/// Closures of type `Fn(u32, &E)` implement this trait.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::RetryObserver;
///
/// struct MetricsObserver {
///     // Your metrics client here
/// }
///
/// impl RetryObserver<std::io::Error> for MetricsObserver {
///     fn on_retry(&self, attempt: u32, error: &std::io::Error) {
///         // Record a retry metric tagged with error.kind()
///     }
/// }
/// ```
pub trait RetryObserver<E>: Send + Sync {
    /// Called after a failed attempt, before waiting for the next one
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt index that failed (0-indexed)
    /// * `error` - The error that caused the failure
    fn on_retry(&self, attempt: u32, error: &E);
}

impl<E, F> RetryObserver<E> for F
where
    F: Fn(u32, &E) + Send + Sync,
{
    fn on_retry(&self, attempt: u32, error: &E) {
        self(attempt, error)
    }
}

/// A no-op observer, the default
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl<E> RetryObserver<E> for NoOpObserver {
    fn on_retry(&self, _attempt: u32, _error: &E) {}
}

/// An observer that logs retries at WARN level using the `tracing` crate
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::TracingObserver;
///
/// // Create with operation name for better log context
/// let observer = TracingObserver::new("fetch-manifest");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl<E: fmt::Display> RetryObserver<E> for TracingObserver {
    fn on_retry(&self, attempt: u32, error: &E) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            "attempt failed, will retry"
        );
    }
}

/// An observer that records which attempts were retried
///
/// Clones share the same record, so keep one handle and pass another to the
/// executor. Useful for testing and metrics collection.
#[derive(Debug, Clone, Default)]
pub struct StatsObserver {
    retried: Arc<Mutex<Vec<u32>>>,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retries observed
    pub fn retries(&self) -> usize {
        self.retried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Attempt indices passed to `on_retry`, in call order
    pub fn attempts(&self) -> Vec<u32> {
        self.retried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<E> RetryObserver<E> for StatsObserver {
    fn on_retry(&self, attempt: u32, _error: &E) {
        self.retried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attempt);
    }
}
