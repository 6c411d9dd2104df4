//! Declarative retry policies
//!
//! These types let retry settings live in configuration files instead of
//! code. A [`RetryPolicy`] converts into the option list accepted by
//! [`crate::retry::Retrier::from_options`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::{self, DelayFn, RetryOption};

/// Retry policy configurations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Default retry policy
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl RetryPoliciesConfig {
    /// Parse and validate policies from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the default policy and every per-operation policy
    pub fn validate(&self) -> Result<()> {
        self.default.validate()?;
        for (operation, policy) in &self.operations {
            policy.validate().map_err(|err| match err {
                Error::InvalidPolicy { message } => {
                    Error::invalid_policy(format!("operation '{}': {}", operation, message))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// The policy for `operation`, falling back to the default
    pub fn policy_for(&self, operation: &str) -> &RetryPolicy {
        self.operations.get(operation).unwrap_or(&self.default)
    }
}

/// Retry policy for an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of attempts; 0 retries until success
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds
    #[serde(default = "default_delay")]
    pub delay_ms: u64,

    /// Maximum delay in milliseconds; 0 means no ceiling
    #[serde(default)]
    pub max_delay_ms: u64,

    /// Upper bound for random jitter in milliseconds
    #[serde(default = "default_max_jitter")]
    pub max_jitter_ms: u64,

    /// Delay strategy
    #[serde(default)]
    pub strategy: DelayStrategy,

    /// Report only the last error instead of the full history
    #[serde(default)]
    pub last_error_only: bool,

    /// Chain a cancellation with the last operation error
    #[serde(default)]
    pub wrap_cancel_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay(),
            max_delay_ms: 0,
            max_jitter_ms: default_max_jitter(),
            strategy: DelayStrategy::default(),
            last_error_only: false,
            wrap_cancel_error: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    retry::DEFAULT_ATTEMPTS
}
fn default_delay() -> u64 {
    retry::DEFAULT_DELAY.as_millis() as u64
}
fn default_max_jitter() -> u64 {
    retry::DEFAULT_MAX_JITTER.as_millis() as u64
}

impl RetryPolicy {
    /// Check that the settings are consistent
    pub fn validate(&self) -> Result<()> {
        if self.strategy.uses_jitter() && self.max_jitter_ms == 0 {
            return Err(Error::invalid_policy(format!(
                "strategy '{}' needs a non-zero max-jitter-ms",
                self.strategy
            )));
        }
        if self.max_delay_ms > 0 && self.max_delay_ms < self.delay_ms {
            return Err(Error::invalid_policy(format!(
                "max-delay-ms ({}) is below delay-ms ({})",
                self.max_delay_ms, self.delay_ms
            )));
        }
        Ok(())
    }

    /// Convert into retry options, applied in declaration order
    pub fn options<E: 'static>(&self) -> Vec<RetryOption<E>> {
        vec![
            retry::attempts(self.max_attempts),
            retry::delay(Duration::from_millis(self.delay_ms)),
            retry::max_delay(Duration::from_millis(self.max_delay_ms)),
            retry::max_jitter(Duration::from_millis(self.max_jitter_ms)),
            retry::delay_type(self.strategy.delay_fn()),
            retry::last_error_only(self.last_error_only),
            retry::wrap_cancel_error_with_last_error(self.wrap_cancel_error),
        ]
    }
}

/// Delay strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DelayStrategy {
    /// Constant delay
    Fixed,

    /// Exponential backoff
    BackOff,

    /// Random delay below max-jitter-ms
    Random,

    /// Exponential backoff plus random jitter (default)
    #[default]
    BackOffWithJitter,

    /// Constant delay plus random jitter
    FixedWithJitter,
}

impl DelayStrategy {
    /// Whether the strategy draws from the jitter range
    pub fn uses_jitter(self) -> bool {
        matches!(
            self,
            DelayStrategy::Random | DelayStrategy::BackOffWithJitter | DelayStrategy::FixedWithJitter
        )
    }

    /// The delay policy implementing this strategy
    pub fn delay_fn<E: 'static>(self) -> DelayFn<E> {
        match self {
            DelayStrategy::Fixed => Arc::new(retry::fixed_delay::<E>),
            DelayStrategy::BackOff => Arc::new(retry::back_off_delay::<E>),
            DelayStrategy::Random => Arc::new(retry::random_delay::<E>),
            DelayStrategy::BackOffWithJitter => retry::combine_delay(vec![
                Arc::new(retry::back_off_delay::<E>) as DelayFn<E>,
                Arc::new(retry::random_delay::<E>),
            ]),
            DelayStrategy::FixedWithJitter => retry::combine_delay(vec![
                Arc::new(retry::fixed_delay::<E>) as DelayFn<E>,
                Arc::new(retry::random_delay::<E>),
            ]),
        }
    }
}

impl std::fmt::Display for DelayStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DelayStrategy::Fixed => "fixed",
            DelayStrategy::BackOff => "back-off",
            DelayStrategy::Random => "random",
            DelayStrategy::BackOffWithJitter => "back-off-with-jitter",
            DelayStrategy::FixedWithJitter => "fixed-with-jitter",
        };
        f.write_str(name)
    }
}
