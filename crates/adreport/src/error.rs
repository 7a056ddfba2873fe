//! Error types for the reporting tool.

use std::path::PathBuf;

use thiserror::Error;

use crate::directory::DirectoryError;

/// Result alias used by the reporters.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while resolving arguments or producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Missing or invalid command-line input.
    #[error("usage error: {msg}")]
    Usage {
        /// What was wrong with the input.
        msg: String,
    },

    /// Output directory or report file could not be created or written.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded as CSV.
    #[error("CSV encoding error")]
    Csv(#[from] csv::Error),

    /// Directory query failed.
    #[error("directory query failed: {0}")]
    Directory(#[from] DirectoryError),

    /// One or more domain controllers could not be queried.
    #[error("replication status could not be collected from: {}", hosts.join(", "))]
    ControllersFailed {
        /// Host names of the controllers that failed.
        hosts: Vec<String>,
    },
}

impl ReportError {
    /// Build a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        ReportError::Usage { msg: msg.into() }
    }

    /// Build a filesystem error for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
