use riskwatch_sink::SinkError;
use riskwatch_source::SourceError;
use riskwatch_types::{ConfigError, EntityId, ErrorKind, SchemaError};
use thiserror::Error;

/// Any failure of a pipeline run, with a structured kind.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Config(_) => ErrorKind::Config,
            Self::Source(_) => ErrorKind::Source,
            Self::Sink(_) => ErrorKind::Sink,
        }
    }

    /// Offending entity, for schema errors.
    pub fn entity(&self) -> Option<&EntityId> {
        match self {
            Self::Schema(e) => Some(e.entity()),
            _ => None,
        }
    }

    /// Offending column, for schema errors.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Schema(e) => Some(e.column()),
            _ => None,
        }
    }
}

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;
