//! # riskwatch-window
//!
//! Trailing-window rolling features, computed per entity in one pass.
//!
//! ```text
//!   EntitySeries ──► WindowedFeatureExtractor ──► Vec<FeatureRow>
//!                         │
//!                         └── one RollingWindow per FeatureSpec
//!                               ├── ring buffer of the W latest values
//!                               └── running sum / sum of squares
//! ```
//!
//! A feature exists at a position only once its window holds at least
//! `min_periods` records. A flat window yields `std == 0`, which is a
//! defined value and distinct from "not enough data".

#![deny(unsafe_code)]

pub mod extractor;
pub mod rolling;

pub use extractor::{FeatureRow, FeatureSpec, WindowedFeatureExtractor};
pub use rolling::{direct_stats, RollingWindow, WindowStats};
