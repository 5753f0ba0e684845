//! # riskwatch-sink
//!
//! Output boundary of a pipeline run.
//!
//! - **ScoredTable**: one row per input record with raw metrics, features,
//!   score and segment
//! - **AlertTable**: rows at or above the severity floor with their action
//! - **NarrativeReport**: Markdown summary with counts, top scores and the
//!   scored table digest
//! - **ResultSink**: persists a rendered [`Artifacts`] set all at once
//!
//! Everything is rendered in memory before any sink is touched, so a run
//! either writes a complete, consistent artifact set or nothing.

#![deny(unsafe_code)]

pub mod error;
pub mod report;
pub mod sink;
pub mod table;

pub use error::{SinkError, SinkResult};
pub use report::{NarrativeReport, ReportOptions};
pub use sink::{
    digest, Artifacts, DirectorySink, MemorySink, ResultSink, ALERTS_FILE, REPORT_FILE, SCORED_FILE,
};
pub use table::{AlertRow, AlertTable, FeatureCell, ScoredRow, ScoredTable};
