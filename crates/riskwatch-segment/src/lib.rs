//! # riskwatch-segment
//!
//! Maps a score to an ordinal [`Segment`](riskwatch_types::Segment) through
//! an explicit, ordered table of bands.
//!
//! Boundary policy: each band is `[lower, upper)`, except the topmost band
//! whose upper bound is inclusive. A score sitting exactly on a threshold
//! therefore lands in the higher-severity band.

#![deny(unsafe_code)]

pub mod table;

pub use table::{Band, SegmentTable, MAX_SEGMENTS};
