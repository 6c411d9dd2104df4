//! Timer abstraction for the inter-attempt wait
//!
//! The executor never sleeps directly; it asks a [`Timer`] for a future that
//! resolves after the delay. Swap the timer to make time-based behaviour
//! deterministic in tests.

use std::time::Duration;

use futures::future::BoxFuture;

/// Produces futures that complete after a given delay
pub trait Timer: Send + Sync {
    /// Return a future that resolves once `delay` has elapsed
    fn after(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// The production timer, backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn after(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
