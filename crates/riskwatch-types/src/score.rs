use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::EntityId;

/// One normalized scalar per scored record.
///
/// Z-score calibrations are unbounded; risk calibrations stay inside
/// their declared domain (e.g. `[0, 1]`). Always finite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Score {
    pub fn new(entity_id: EntityId, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            entity_id,
            timestamp,
            value,
        }
    }
}
