//! Per-attempt error classification
//!
//! An operation run under the retry engine reports failures as
//! `AttemptError<E>`. The `Unrecoverable` variant is the marker that tells
//! the loop to stop immediately, whatever budget remains.

use std::error::Error;
use std::fmt;

/// Error returned by a single attempt of a retried operation
///
/// `From<E>` is implemented, so `?` inside an operation marks an error as
/// transient. Wrap it with [`unrecoverable`] to stop retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError<E> {
    /// The attempt failed and may be retried according to policy
    Transient(E),

    /// The attempt failed and must not be retried
    Unrecoverable(E),
}

impl<E> AttemptError<E> {
    /// Returns true unless this error carries the unrecoverable marker
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AttemptError::Transient(_))
    }

    /// Borrow the wrapped error
    pub fn inner(&self) -> &E {
        match self {
            AttemptError::Transient(err) | AttemptError::Unrecoverable(err) => err,
        }
    }

    /// Strip the marker and return the wrapped error
    pub fn into_inner(self) -> E {
        match self {
            AttemptError::Transient(err) | AttemptError::Unrecoverable(err) => err,
        }
    }
}

impl<E> From<E> for AttemptError<E> {
    fn from(err: E) -> Self {
        AttemptError::Transient(err)
    }
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Transparent: the marker adds nothing to the message.
        fmt::Display::fmt(self.inner(), f)
    }
}

impl<E: Error + 'static> Error for AttemptError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Mark an error so the retry loop treats it as non-retriable
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{is_recoverable, unrecoverable, AttemptError};
///
/// let err: AttemptError<&str> = unrecoverable("bad credentials");
/// assert!(!is_recoverable(&err));
/// assert_eq!(err.into_inner(), "bad credentials");
/// ```
pub fn unrecoverable<E>(err: E) -> AttemptError<E> {
    AttemptError::Unrecoverable(err)
}

/// Report whether an attempt error may be retried
pub fn is_recoverable<E>(err: &AttemptError<E>) -> bool {
    err.is_recoverable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_question_mark_marks_transient() {
        fn op() -> Result<(), AttemptError<io::Error>> {
            Err::<(), _>(io::Error::other("boom"))?;
            Ok(())
        }

        let err = op().unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.inner().to_string(), "boom");
    }

    #[test]
    fn test_unrecoverable_is_not_recoverable() {
        let err = unrecoverable(io::Error::other("fatal"));
        assert!(!is_recoverable(&err));
        assert_eq!(err.into_inner().to_string(), "fatal");
    }

    #[test]
    fn test_display_is_transparent() {
        let err: AttemptError<String> = unrecoverable("disk full".to_string());
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_source_is_wrapped_error() {
        let err = AttemptError::Transient(io::Error::other("inner"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("inner"));
    }
}
