//! Type definitions for declarative retry configuration

mod retry_policy;

pub use retry_policy::*;
