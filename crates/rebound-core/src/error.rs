//! Error types for rebound-core
//!
//! Errors returned by a retried operation are reported through
//! [`crate::retry::RetryError`]; this module covers the library's own
//! failures, such as loading retry policies.

use thiserror::Error;

/// Result type alias using rebound-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for rebound
#[derive(Error, Debug)]
pub enum Error {
    /// Inconsistent retry policy settings
    #[error("Invalid retry policy: {message}")]
    InvalidPolicy { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),
}

impl Error {
    /// Create an invalid policy error
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_policy_message() {
        let err = Error::invalid_policy("max-delay-ms is below delay-ms");
        assert_eq!(
            err.to_string(),
            "Invalid retry policy: max-delay-ms is below delay-ms"
        );
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml_ng::from_str::<u32>("not a number").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(err.to_string().starts_with("YAML parsing error:"));
    }
}
