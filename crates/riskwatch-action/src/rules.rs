//! Configured action rules and presets.

use serde::{Deserialize, Serialize};

/// `segment → (action, reason template)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRule {
    /// Segment label the rule applies to.
    pub segment: String,
    /// Recommended action.
    pub action: String,
    /// Reason template, see [`ReasonTemplate`](crate::ReasonTemplate).
    pub reason: String,
}

impl ActionRule {
    pub fn new(
        segment: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            segment: segment.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Unvalidated list of rules, as loaded from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTable {
    pub rules: Vec<ActionRule>,
}

impl ActionTable {
    pub fn new(rules: Vec<ActionRule>) -> Self {
        Self { rules }
    }

    /// Rules for the `LOW < MEDIUM < HIGH` z-score table.
    pub fn anomaly() -> Self {
        Self::new(vec![
            ActionRule::new("LOW", "NO ACTION", "Within normal range"),
            ActionRule::new("MEDIUM", "WATCH", "Elevated deviation (z={score})"),
            ActionRule::new("HIGH", "INVESTIGATE", "Anomalous spike (z={score})"),
        ])
    }

    /// Rules for the `LOW < MEDIUM < HIGH` risk table.
    pub fn risk() -> Self {
        Self::new(vec![
            ActionRule::new("LOW", "NO ACTION", "Low risk_score ({score})"),
            ActionRule::new("MEDIUM", "MONITOR + NUDGE", "Medium risk_score ({score})"),
            ActionRule::new("HIGH", "CALL + REVIEW", "High risk_score ({score})"),
        ])
    }

    /// Rules for the `ON_TIME < MINOR < MODERATE < SEVERE` delay table.
    pub fn delay() -> Self {
        Self::new(vec![
            ActionRule::new("ON_TIME", "NO ACTION", "On time"),
            ActionRule::new(
                "MINOR",
                "MONITOR",
                "Minor predicted delay ({score} h, confidence {confidence})",
            ),
            ActionRule::new(
                "MODERATE",
                "ALLOCATE RESOURCES",
                "Moderate predicted delay ({score} h, confidence {confidence})",
            ),
            ActionRule::new(
                "SEVERE",
                "ESCALATE + REPLAN",
                "High predicted delay ({score} h, confidence {confidence})",
            ),
        ])
    }
}
