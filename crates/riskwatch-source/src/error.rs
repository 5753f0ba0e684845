use thiserror::Error;

/// Errors raised while producing records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source parameter '{name}': {detail}")]
    InvalidParameter { name: String, detail: String },

    #[error("distribution error: {0}")]
    Distribution(String),
}

impl SourceError {
    pub fn invalid(name: &str, detail: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

/// Convenience alias for source results.
pub type SourceResult<T> = Result<T, SourceError>;
