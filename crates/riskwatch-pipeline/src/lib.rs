//! # riskwatch-pipeline
//!
//! Wires the scoring components into a single deterministic batch pass:
//!
//! ```text
//! SeriesSource ─► partition ─► WindowedFeatureExtractor ─► ScoreCalculator
//!                 (per entity)                                   │
//!   ResultSink ◄─ render ◄─ alerts + ActionDeriver ◄─ SegmentTable
//! ```
//!
//! - **PipelineConfig**: serde-loadable configuration, validated once into a
//!   [`ValidatedPipeline`] so nothing configuration-related fails mid-run
//! - **ValidatedPipeline::run**: schema check, per-entity scoring, alerts and
//!   rendering, all in memory
//! - **ValidatedPipeline::execute**: load from a source, run, write to a sink
//! - **Scenario**: the four built-in demo configurations

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scenario;

pub use config::{
    AlertPolicy, AlertScope, FeatureConfig, PipelineConfig, ValidatedPipeline, WindowDefaults,
};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{RunOutput, RunStats};
pub use scenario::{Scenario, SourceConfig};
