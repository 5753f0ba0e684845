use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::EntityId;
use crate::segment::Segment;

/// Recommended operational response for one scored record.
///
/// `action_label` depends only on `segment`; `reason` may additionally
/// embed auxiliary context such as the score or a confidence value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub segment: Segment,
    pub action_label: String,
    pub reason: String,
}
