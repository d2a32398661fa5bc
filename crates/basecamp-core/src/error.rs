//! Error types for basecamp-core

use thiserror::Error;

/// A mutating stage action failed.
///
/// This is fatal for a deployment run: the runner aborts on the first
/// `ActionError` because every later stage assumes all earlier ones fully
/// succeeded. The boxed closures in a `Stage` map their underlying failures
/// (cluster API errors, subprocess exit codes) into this type at the edge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ActionError {
    /// Human-readable description of what failed
    pub message: String,
}

impl ActionError {
    /// Create a new action error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
