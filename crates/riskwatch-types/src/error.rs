use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::record::EntityId;

/// Coarse classification carried by every pipeline error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input records do not match the columns the pipeline needs.
    Schema,
    /// Pipeline configuration rejected at validation time.
    Config,
    /// The record source could not produce records.
    Source,
    /// Results could not be rendered or persisted.
    Sink,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema => write!(f, "schema"),
            Self::Config => write!(f, "config"),
            Self::Source => write!(f, "source"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// Input records are missing a required column or carry an unusable value.
///
/// Raised before any feature computation begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("record for entity {entity} at {timestamp} is missing required column '{column}'")]
    MissingColumn {
        entity: EntityId,
        timestamp: DateTime<Utc>,
        column: String,
    },

    #[error("record for entity {entity} at {timestamp} has non-finite value {value} in column '{column}'")]
    NonFiniteValue {
        entity: EntityId,
        timestamp: DateTime<Utc>,
        column: String,
        value: f64,
    },
}

impl SchemaError {
    /// Entity whose record failed the schema check.
    pub fn entity(&self) -> &EntityId {
        match self {
            Self::MissingColumn { entity, .. } | Self::NonFiniteValue { entity, .. } => entity,
        }
    }

    /// Offending column.
    pub fn column(&self) -> &str {
        match self {
            Self::MissingColumn { column, .. } | Self::NonFiniteValue { column, .. } => column,
        }
    }
}

/// Configuration rejected during validation, never discovered mid-run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("feature '{feature}': window {window} must exceed min_periods {min_periods}")]
    WindowNotAboveMinPeriods {
        feature: String,
        window: usize,
        min_periods: usize,
    },

    #[error("feature '{feature}': min_periods must be at least 1")]
    ZeroMinPeriods { feature: String },

    #[error("duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("{context} references unknown feature '{feature}'")]
    UnknownFeature { context: String, feature: String },

    #[error("segment table has no bands")]
    EmptySegmentTable,

    #[error("segment table has too many bands: {0}")]
    TooManySegments(usize),

    #[error("duplicate segment label: {0}")]
    DuplicateSegment(String),

    #[error("segment '{label}' has an empty or inverted interval [{lower}, {upper})")]
    EmptyBand { label: String, lower: f64, upper: f64 },

    #[error("segment '{label}' has a NaN bound")]
    NanBound { label: String },

    #[error("segment bands '{below}' and '{above}' are not contiguous: upper {upper} != lower {lower}")]
    SegmentsNotContiguous {
        below: String,
        above: String,
        upper: f64,
        lower: f64,
    },

    #[error("segment table [{table_min}, {table_max}] does not cover score domain [{domain_min}, {domain_max}]")]
    DomainNotCovered {
        domain_min: f64,
        domain_max: f64,
        table_min: f64,
        table_max: f64,
    },

    #[error("unknown segment label: {0}")]
    UnknownSegment(String),

    #[error("no action rule for segment '{0}'")]
    MissingActionRule(String),

    #[error("more than one action rule for segment '{0}'")]
    DuplicateActionRule(String),

    #[error("action rule for '{segment}' has invalid reason template: {detail}")]
    InvalidTemplate { segment: String, detail: String },

    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("invalid parameter '{name}': {detail}")]
    InvalidParameter { name: String, detail: String },
}

/// Convenience alias for schema-checked results.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
