//! # riskwatch-types
//!
//! Shared data model for the Riskwatch scoring pipelines.
//!
//! Every pipeline follows the same forward-only flow:
//!
//! ```text
//!   Record ──► WindowedFeature ──► Score ──► Segment ──► Action
//!   (source)   (rolling window)   (calib.)  (bands)     (rules)
//! ```
//!
//! `Record`s are immutable once ingested. Everything downstream is derived,
//! recomputed per run and keyed by `(entity_id, timestamp)`.

#![deny(unsafe_code)]

pub mod action;
pub mod error;
pub mod feature;
pub mod record;
pub mod score;
pub mod segment;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use action::Action;
pub use error::{ConfigError, ConfigResult, ErrorKind, SchemaError, SchemaResult};
pub use feature::WindowedFeature;
pub use record::{EntityId, EntitySeries, Partitioned, Record, RecordKey, RecordSet};
pub use score::Score;
pub use segment::Segment;

/// Timestamp layout used in every tabular artifact.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
