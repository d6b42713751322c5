//! Error types for benchmark setup and reporting.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for squeezebench operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that abort a benchmark execution.
///
/// Per-run problems (a compressor exiting non-zero, an empty artifact) are not
/// errors at this level; they are reported as [`crate::RunFailure`] and the
/// batch keeps going.
#[derive(Debug)]
pub enum BenchError {
    /// The corpus directory is missing, unreadable or has no regular files.
    Corpus(String),

    /// A required compression binary cannot be spawned.
    MissingBinary(String),

    /// A filesystem operation failed.
    Io {
        /// Path the operation was acting on
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// An algorithm selector did not match any known codec or level.
    UnknownAlgorithm(String),

    /// Report serialization failed.
    Report(String),

    /// Configuration values conflict with each other.
    Config(String),
}

impl BenchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Corpus(msg) => write!(f, "Corpus unavailable: {}", msg),
            BenchError::MissingBinary(name) => {
                write!(f, "Missing binary: {} (is it installed and on PATH?)", name)
            }
            BenchError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            BenchError::UnknownAlgorithm(sel) => write!(f, "Unknown algorithm: {}", sel),
            BenchError::Report(msg) => write!(f, "Report generation failed: {}", msg),
            BenchError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<csv::Error> for BenchError {
    fn from(e: csv::Error) -> Self {
        BenchError::Report(e.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(e: serde_json::Error) -> Self {
        BenchError::Report(e.to_string())
    }
}
