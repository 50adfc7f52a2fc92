//! Error types for the measurement harness.

use std::path::PathBuf;

use thiserror::Error;
use visibility_service::BackendError;

/// Errors that abort a harness operation.
///
/// Objects that are not yet visible, or never become visible, are not errors. They are recorded
/// as outcomes in the detection log instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A storage backend fault that the configured policy treats as fatal.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A write kept failing after all retries were used up.
    #[error("failed to write item {index} after {attempts} attempts")]
    WriteFailed {
        index: u64,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// A log or ledger file could not be read or written.
    #[error("failed to access {}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A log line could not be parsed.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Percentiles were requested over an empty set of samples.
    #[error("no latency samples to summarize")]
    EmptyInput,

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation was interrupted before it completed.
    #[error("interrupted")]
    Cancelled,
}

impl HarnessError {
    pub(crate) fn log(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Log {
            path: path.into(),
            source,
        }
    }
}

/// Result type for harness operations.
pub type HarnessResult<T, E = HarnessError> = std::result::Result<T, E>;
