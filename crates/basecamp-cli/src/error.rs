//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

#![allow(dead_code)] // Some variants/methods are for future use

use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid user input (bad mirror name, bad flag combination)
    #[error("Invalid input: {message}")]
    #[diagnostic(code(basecamp::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Could not reach or operate against the cluster
    #[error("Cluster error: {message}")]
    #[diagnostic(code(basecamp::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A deployment stage's action failed; the run was aborted
    #[error("Deployment aborted at stage '{stage}': {message}")]
    #[diagnostic(
        code(basecamp::cli::deploy),
        help("Earlier stages are idempotent; fix the cause and re-run the same command.")
    )]
    Deploy { stage: String, message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(basecamp::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(basecamp::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::Cluster { .. } => exit_codes::ERROR,
            CliError::Deploy { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create a cluster error with a connection hint
    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: Some("Check that the kubeconfig is reachable and points at the right cluster.".to_string()),
        }
    }

    /// Create a deployment error naming the failing stage
    pub fn deploy(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deploy {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<basecamp_kube::KubeError> for CliError {
    fn from(err: basecamp_kube::KubeError) -> Self {
        CliError::cluster(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
