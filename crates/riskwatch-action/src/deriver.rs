//! Segment-indexed action lookup.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use riskwatch_segment::SegmentTable;
use riskwatch_types::{Action, ConfigError, ConfigResult, EntityId, Segment};
use tracing::debug;

use crate::rules::ActionTable;
use crate::template::ReasonTemplate;

/// Auxiliary fields a reason may mention.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionContext {
    pub score: Option<f64>,
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug)]
struct CompiledRule {
    label: String,
    action: String,
    reason: ReasonTemplate,
}

/// Rules checked for totality against a segment table.
///
/// Rule `i` belongs to segment level `i`, so derivation is an index, not a
/// search.
#[derive(Clone, Debug)]
pub struct ActionDeriver {
    rules: Vec<CompiledRule>,
}

impl ActionDeriver {
    /// Reject unknown, duplicate and missing rules and malformed templates.
    pub fn new(table: &ActionTable, segments: &SegmentTable) -> ConfigResult<Self> {
        let mut by_label: HashMap<&str, &crate::rules::ActionRule> = HashMap::new();
        for rule in &table.rules {
            segments.segment(&rule.segment)?;
            if by_label.insert(rule.segment.as_str(), rule).is_some() {
                return Err(ConfigError::DuplicateActionRule(rule.segment.clone()));
            }
        }

        let rules = segments
            .segments()
            .into_iter()
            .map(|segment| {
                let rule = by_label
                    .get(segment.label.as_str())
                    .ok_or_else(|| ConfigError::MissingActionRule(segment.label.clone()))?;
                let reason = ReasonTemplate::parse(&rule.reason).map_err(|detail| {
                    ConfigError::InvalidTemplate {
                        segment: segment.label.clone(),
                        detail,
                    }
                })?;
                Ok(CompiledRule {
                    label: segment.label,
                    action: rule.action.clone(),
                    reason,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        debug!(rules = rules.len(), "compiled action rules");
        Ok(Self { rules })
    }

    /// Action label for a segment.
    pub fn action_label(&self, segment: &Segment) -> ConfigResult<&str> {
        self.rule(segment).map(|r| r.action.as_str())
    }

    /// Full action for one scored record.
    pub fn derive(
        &self,
        entity_id: &EntityId,
        timestamp: DateTime<Utc>,
        segment: &Segment,
        context: ActionContext,
    ) -> ConfigResult<Action> {
        let rule = self.rule(segment)?;
        Ok(Action {
            entity_id: entity_id.clone(),
            timestamp,
            segment: segment.clone(),
            action_label: rule.action.clone(),
            reason: rule
                .reason
                .render(&segment.label, context.score, context.confidence),
        })
    }

    fn rule(&self, segment: &Segment) -> ConfigResult<&CompiledRule> {
        self.rules
            .get(segment.level)
            .filter(|r| r.label == segment.label)
            .ok_or_else(|| ConfigError::UnknownSegment(segment.label.clone()))
    }
}
