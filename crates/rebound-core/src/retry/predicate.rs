//! Retry predicates
//!
//! A predicate decides, after a failed attempt, whether another attempt is
//! worth making. It sees the error still wrapped in [`AttemptError`], so it
//! can tell the unrecoverable marker apart from ordinary failures.

use super::attempt::AttemptError;

/// A predicate that determines whether a failed attempt should be retried
///
/// Closures of type `Fn(&AttemptError<E>) -> bool` implement this trait, so
/// most callers never name it.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{AttemptError, RetryPredicate};
/// use std::io::{Error, ErrorKind};
///
/// struct SkipPermanent;
///
/// impl RetryPredicate<Error> for SkipPermanent {
///     fn should_retry(&self, error: &AttemptError<Error>) -> bool {
///         error.is_recoverable()
///             && !matches!(
///                 error.inner().kind(),
///                 ErrorKind::NotFound | ErrorKind::PermissionDenied
///             )
///     }
/// }
/// ```
pub trait RetryPredicate<E>: Send + Sync {
    /// Determine whether the given error should be retried
    fn should_retry(&self, error: &AttemptError<E>) -> bool;
}

/// The default predicate: retry everything except unrecoverable errors
#[derive(Debug, Clone, Copy, Default)]
pub struct IsRecoverable;

impl<E> RetryPredicate<E> for IsRecoverable {
    fn should_retry(&self, error: &AttemptError<E>) -> bool {
        error.is_recoverable()
    }
}

impl<E, F> RetryPredicate<E> for F
where
    F: Fn(&AttemptError<E>) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &AttemptError<E>) -> bool {
        self(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::attempt::unrecoverable;
    use std::io;

    #[test]
    fn test_is_recoverable_predicate() {
        let transient = AttemptError::Transient(io::Error::other("timeout"));
        let fatal = unrecoverable(io::Error::other("fatal"));

        assert!(IsRecoverable.should_retry(&transient));
        assert!(!IsRecoverable.should_retry(&fatal));
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |err: &AttemptError<io::Error>| {
            matches!(
                err.inner().kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            )
        };

        let timeout = AttemptError::Transient(io::Error::new(io::ErrorKind::TimedOut, "t"));
        let not_found = AttemptError::Transient(io::Error::new(io::ErrorKind::NotFound, "n"));

        assert!(predicate.should_retry(&timeout));
        assert!(!predicate.should_retry(&not_found));
    }
}
