//! # rebound-core
//!
//! Retry library for async Rust providing:
//! - A retry loop with global and per-error attempt budgets
//! - Pluggable delay policies (fixed, exponential backoff, random jitter)
//! - Unrecoverable error marking and custom retry predicates
//! - Full error history or last-error-only reporting
//! - Cancellation through `tokio_util::sync::CancellationToken`
//! - Declarative retry policies loadable from YAML

pub mod error;
pub mod retry;
pub mod types;

pub use error::{Error, Result};
pub use retry::{retry, retry_with, unrecoverable, AttemptError, Retrier, RetryError};
pub use types::{DelayStrategy, RetryPoliciesConfig, RetryPolicy};
