use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while rendering or persisting artifacts.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sink lock poisoned")]
    LockError,
}

impl SinkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for sink results.
pub type SinkResult<T> = Result<T, SinkError>;
