//! Error types for the impt library.

use std::path::PathBuf;

use thiserror::Error;

use super::MutantStatus;

/// Result type alias using impt's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while prioritizing or reducing mutants.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Scoring weights that do not add up to one.
    #[error("Scoring weights must sum to 1.0, got {sum:.4}")]
    InvalidWeights { sum: f64 },

    /// Operator key that matches no known mutation operator.
    #[error("Unknown mutation operator: {0}")]
    UnknownOperator(String),

    /// Status change that the mutant lifecycle does not allow.
    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: MutantStatus, to: MutantStatus },

    /// Framework adapter failure.
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// Reading or writing a persisted store failed.
    #[error("Persistence error at {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    /// Source analysis failed for a file.
    #[error("Analysis error in {path}: {message}")]
    Analysis { path: PathBuf, message: String },
}

impl Error {
    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new adapter error.
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter(message.into())
    }

    /// Create a new persistence error.
    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new analysis error.
    pub fn analysis(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Analysis {
            path: path.into(),
            message: message.into(),
        }
    }
}
