//! Error types for the retry execution engine
//!
//! A failed retry invocation surfaces as a single [`RetryError`]. Depending
//! on configuration it carries the full per-attempt [`ErrorHistory`], only
//! the last operation error, or the cancellation that interrupted the loop.

use std::error::Error;
use std::fmt;

/// Header line of a rendered error history
pub const HISTORY_HEADER: &str = "All attempts fail:";

/// The cancellation signal fired before the next attempt could start
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// One recorded failure in an error history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure<E> {
    /// The operation returned an error
    Operation(E),

    /// The wait before the next attempt was cancelled
    Cancelled(Cancelled),
}

impl<E> Failure<E> {
    /// The operation error, if this failure is one
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Failure::Operation(err) => Some(err),
            Failure::Cancelled(_) => None,
        }
    }

    /// Check if this failure records a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Failure::Cancelled(_))
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Operation(err) => fmt::Display::fmt(err, f),
            Failure::Cancelled(cancelled) => fmt::Display::fmt(cancelled, f),
        }
    }
}

impl<E: Error + 'static> Error for Failure<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Failure::Operation(err) => Some(err),
            Failure::Cancelled(cancelled) => Some(cancelled),
        }
    }
}

/// Ordered record of failed attempts, one slot per attempt index
///
/// Slots may be empty; empty slots are skipped when rendering but keep the
/// numbering of the slots around them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHistory<E> {
    slots: Vec<Option<Failure<E>>>,
}

impl<E> Default for ErrorHistory<E> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<E> ErrorHistory<E> {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `failure` at slot `index`, growing the history with empty slots
    /// if needed
    pub fn record(&mut self, index: usize, failure: Failure<E>) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(failure);
    }

    /// Number of slots, including empty ones
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in attempt order
    pub fn slots(&self) -> &[Option<Failure<E>>] {
        &self.slots
    }

    /// Recorded failures in attempt order, skipping empty slots
    pub fn iter(&self) -> impl Iterator<Item = &Failure<E>> {
        self.slots.iter().flatten()
    }

    /// The chronologically last recorded failure
    pub fn last_error(&self) -> Option<&Failure<E>> {
        self.slots.iter().rev().flatten().next()
    }

    /// Take the chronologically last recorded failure
    pub fn into_last_error(self) -> Option<Failure<E>> {
        self.slots.into_iter().rev().flatten().next()
    }

    /// Check if any recorded failure satisfies `predicate`
    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&Failure<E>) -> bool,
    {
        self.iter().any(predicate)
    }

    /// Check if `target` was returned by any attempt
    pub fn contains(&self, target: &E) -> bool
    where
        E: PartialEq,
    {
        self.any(|failure| failure.operation_error() == Some(target))
    }

    /// Check if a cancellation was recorded
    pub fn is_cancelled(&self) -> bool {
        self.iter().any(Failure::is_cancelled)
    }
}

impl<E: fmt::Display> fmt::Display for ErrorHistory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HISTORY_HEADER)?;
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(failure) = slot {
                write!(f, "\n#{}: {}", index + 1, failure)?;
            }
        }
        Ok(())
    }
}

impl<E: Error + 'static> Error for ErrorHistory<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.last_error().map(|failure| match failure {
            Failure::Operation(err) => err as &(dyn Error + 'static),
            Failure::Cancelled(cancelled) => cancelled,
        })
    }
}

/// Errors returned by a retry invocation
///
/// The error type is generic over `E`, the underlying error type from the
/// operation being retried.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every failed attempt, in order
    ///
    /// Returned when the full history is kept. A cancellation during the
    /// wait is appended as the final failure.
    Failed(ErrorHistory<E>),

    /// Only the error of the final attempt
    ///
    /// Returned in last-error-only mode and for unbounded attempt budgets.
    LastError(E),

    /// The loop was cancelled
    ///
    /// Returned when cancellation fired before the first attempt, or during
    /// a wait when the history is not kept.
    Cancelled(Cancelled),

    /// The loop was cancelled; chained with the last operation error
    CancelledWithLastError {
        /// The cancellation that stopped the loop
        cancelled: Cancelled,
        /// The error from the attempt before the cancelled wait
        last_error: E,
    },
}

impl<E> RetryError<E> {
    /// Check if this error indicates cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            RetryError::Failed(history) => history.is_cancelled(),
            RetryError::LastError(_) => false,
            RetryError::Cancelled(_) | RetryError::CancelledWithLastError { .. } => true,
        }
    }

    /// The full history, when it was kept
    pub fn history(&self) -> Option<&ErrorHistory<E>> {
        match self {
            RetryError::Failed(history) => Some(history),
            _ => None,
        }
    }

    /// The most recent operation error, if any attempt was made
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Failed(history) => history
                .slots()
                .iter()
                .rev()
                .flatten()
                .find_map(Failure::operation_error),
            RetryError::LastError(err) => Some(err),
            RetryError::CancelledWithLastError { last_error, .. } => Some(last_error),
            RetryError::Cancelled(_) => None,
        }
    }

    /// Get the most recent operation error, consuming this error
    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::Failed(history) => history
                .slots
                .into_iter()
                .rev()
                .flatten()
                .find_map(|failure| match failure {
                    Failure::Operation(err) => Some(err),
                    Failure::Cancelled(_) => None,
                }),
            RetryError::LastError(err) => Some(err),
            RetryError::CancelledWithLastError { last_error, .. } => Some(last_error),
            RetryError::Cancelled(_) => None,
        }
    }

    /// Check if any carried operation error satisfies `predicate`
    pub fn any<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&E) -> bool,
    {
        match self {
            RetryError::Failed(history) => history
                .iter()
                .filter_map(Failure::operation_error)
                .any(predicate),
            RetryError::LastError(err) => predicate(err),
            RetryError::CancelledWithLastError { last_error, .. } => predicate(last_error),
            RetryError::Cancelled(_) => false,
        }
    }

    /// Check if `target` is among the carried operation errors
    pub fn contains(&self, target: &E) -> bool
    where
        E: PartialEq,
    {
        self.any(|err| err == target)
    }

    /// Map the error type using a closure
    pub fn map_err<F, E2>(self, mut f: F) -> RetryError<E2>
    where
        F: FnMut(E) -> E2,
    {
        match self {
            RetryError::Failed(history) => RetryError::Failed(ErrorHistory {
                slots: history
                    .slots
                    .into_iter()
                    .map(|slot| {
                        slot.map(|failure| match failure {
                            Failure::Operation(err) => Failure::Operation(f(err)),
                            Failure::Cancelled(cancelled) => Failure::Cancelled(cancelled),
                        })
                    })
                    .collect(),
            }),
            RetryError::LastError(err) => RetryError::LastError(f(err)),
            RetryError::Cancelled(cancelled) => RetryError::Cancelled(cancelled),
            RetryError::CancelledWithLastError {
                cancelled,
                last_error,
            } => RetryError::CancelledWithLastError {
                cancelled,
                last_error: f(last_error),
            },
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Failed(history) => fmt::Display::fmt(history, f),
            RetryError::LastError(err) => fmt::Display::fmt(err, f),
            RetryError::Cancelled(cancelled) => fmt::Display::fmt(cancelled, f),
            RetryError::CancelledWithLastError {
                cancelled,
                last_error,
            } => write!(f, "{}: {}", cancelled, last_error),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Failed(history) => history.source(),
            RetryError::LastError(err) => err.source(),
            RetryError::Cancelled(_) => None,
            RetryError::CancelledWithLastError { last_error, .. } => Some(last_error),
        }
    }
}
