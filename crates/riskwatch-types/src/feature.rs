use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::EntityId;

/// Rolling aggregate of one source column at one record position.
///
/// Only exists once `count_in_window >= min_periods`; positions with less
/// history carry no feature at all rather than a placeholder value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowedFeature {
    /// Feature name from the pipeline configuration.
    pub name: String,
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    /// Configured window width `W`.
    pub window_size: usize,
    /// Mean of the in-window values.
    pub mean: f64,
    /// Population standard deviation of the in-window values. `0` for a flat window.
    pub std: f64,
    /// Number of records currently in the window (`<= window_size`).
    pub count_in_window: usize,
}

impl WindowedFeature {
    /// A window whose values are all equal.
    pub fn is_flat(&self) -> bool {
        self.std == 0.0
    }
}
