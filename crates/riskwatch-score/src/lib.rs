//! # riskwatch-score
//!
//! Maps windowed features (and optionally raw record values) to one scalar
//! score per record.
//!
//! Two calibration families are supported:
//!
//! - **Z-score**: `(raw - mean) / std`, with a flat window scoring exactly `0`
//! - **Bounded**: a weighted sum of transformed inputs, squashed through a
//!   logistic or clipped to a fixed interval
//!
//! Records whose required features are still undefined (window below
//! `min_periods`) are not scored at all; they are never defaulted to zero.

#![deny(unsafe_code)]

pub mod calculator;
pub mod calibration;

pub use calculator::{z_score, ScoreCalculator};
pub use calibration::{Calibration, ConfidenceModel, Input, ScoreDomain, Term, Transform};
