//! # riskwatch-source
//!
//! Record sources feeding the scoring pipeline.
//!
//! A [`SeriesSource`] yields a [`RecordSet`](riskwatch_types::RecordSet) of
//! timestamped, per-entity records. The synthetic generators here take an
//! explicit seed and own their RNG, so the same configuration always yields
//! the same records.
//!
//! | source | entities | columns |
//! |---|---|---|
//! | [`SyntheticEvents`] | assets | `value` |
//! | [`EntityHistory`] | accounts | `activity`, `incidents`, `behavior_index` |
//! | [`JobTimeline`] | jobs | planned/actual duration, execution signals, `delay_h` |
//! | [`SeasonalSpikes`] | one series | `value` |
//! | [`StaticSource`] | any | any |

#![deny(unsafe_code)]

pub mod error;
pub mod events;
pub mod history;
mod sampling;
pub mod seasonal;
pub mod source;
pub mod timeline;

pub use error::{SourceError, SourceResult};
pub use events::SyntheticEvents;
pub use history::EntityHistory;
pub use seasonal::SeasonalSpikes;
pub use source::{SeriesSource, StaticSource};
pub use timeline::JobTimeline;
