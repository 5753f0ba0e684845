//! Tabular outputs and their CSV encoding.
//!
//! Column sets are fixed per run; undefined values (features before
//! `min_periods`, unscored rows) are written as empty cells. Numbers use the
//! shortest decimal form that parses back to the same `f64` (`10`, `10.5`,
//! `0.30000000000000004`), never exponent notation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use riskwatch_types::{Action, EntityId, Segment, WindowedFeature, TIMESTAMP_FORMAT};

use crate::error::SinkResult;

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn encode(header: Vec<String>, rows: impl Iterator<Item = Vec<String>>) -> SinkResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()).into())
}

// ── Scored Table ────────────────────────────────────────────────────────

/// Window statistics of one feature at one record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureCell {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl From<&WindowedFeature> for FeatureCell {
    fn from(f: &WindowedFeature) -> Self {
        Self {
            mean: f.mean,
            std: f.std,
            count: f.count_in_window,
        }
    }
}

/// One input record with everything derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredRow {
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    /// Aligned with [`ScoredTable::raw_columns`].
    pub raw: Vec<f64>,
    /// Aligned with [`ScoredTable::feature_names`].
    pub features: Vec<Option<FeatureCell>>,
    pub confidence: Option<f64>,
    pub score: Option<f64>,
    pub segment: Option<Segment>,
}

/// Full scored output of a run: `entity_id, timestamp, <raw>, <features>,
/// [confidence], score, segment`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredTable {
    pub raw_columns: Vec<String>,
    pub feature_names: Vec<String>,
    pub has_confidence: bool,
    rows: Vec<ScoredRow>,
}

impl ScoredTable {
    pub fn new(raw_columns: Vec<String>, feature_names: Vec<String>, has_confidence: bool) -> Self {
        Self {
            raw_columns,
            feature_names,
            has_confidence,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ScoredRow) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = ScoredRow>) {
        self.rows.extend(rows);
    }

    /// Order rows by timestamp, then entity.
    pub fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| (a.timestamp, &a.entity_id).cmp(&(b.timestamp, &b.entity_id)));
    }

    pub fn rows(&self) -> &[ScoredRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn scored_count(&self) -> usize {
        self.rows.iter().filter(|r| r.score.is_some()).count()
    }

    pub fn unscored_count(&self) -> usize {
        self.len() - self.scored_count()
    }

    pub fn entity_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| &r.entity_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Rows in the given segment.
    pub fn segment_count(&self, segment: &Segment) -> usize {
        self.rows
            .iter()
            .filter(|r| r.segment.as_ref() == Some(segment))
            .count()
    }

    /// Mean |score − reference| over scored rows, `None` if the reference
    /// column is not in the table or nothing was scored.
    pub fn mean_absolute_error(&self, reference: &str) -> Option<f64> {
        let index = self.raw_columns.iter().position(|c| c == reference)?;
        let errors: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|r| r.score.map(|s| (s - r.raw[index]).abs()))
            .collect();
        if errors.is_empty() {
            None
        } else {
            Some(errors.iter().sum::<f64>() / errors.len() as f64)
        }
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["entity_id".to_string(), "timestamp".to_string()];
        header.extend(self.raw_columns.iter().cloned());
        for name in &self.feature_names {
            header.push(format!("{name}_mean"));
            header.push(format!("{name}_std"));
            header.push(format!("{name}_count"));
        }
        if self.has_confidence {
            header.push("confidence".into());
        }
        header.push("score".into());
        header.push("segment".into());
        header
    }

    fn record(&self, row: &ScoredRow) -> Vec<String> {
        let mut out = vec![row.entity_id.to_string(), timestamp(&row.timestamp)];
        out.extend(row.raw.iter().map(|v| v.to_string()));
        for feature in &row.features {
            match feature {
                Some(f) => {
                    out.push(f.mean.to_string());
                    out.push(f.std.to_string());
                    out.push(f.count.to_string());
                }
                None => out.extend(std::iter::repeat(String::new()).take(3)),
            }
        }
        if self.has_confidence {
            out.push(cell(row.confidence));
        }
        out.push(cell(row.score));
        out.push(
            row.segment
                .as_ref()
                .map(|s| s.label.clone())
                .unwrap_or_default(),
        );
        out
    }

    pub fn to_csv(&self) -> SinkResult<Vec<u8>> {
        encode(self.header(), self.rows.iter().map(|r| self.record(r)))
    }
}

// ── Alert Table ─────────────────────────────────────────────────────────

/// One derived action at or above the severity floor.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertRow {
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub segment: Segment,
    pub confidence: Option<f64>,
    pub action_label: String,
    pub reason: String,
}

impl AlertRow {
    pub fn from_action(action: Action, score: f64, confidence: Option<f64>) -> Self {
        Self {
            entity_id: action.entity_id,
            timestamp: action.timestamp,
            score,
            segment: action.segment,
            confidence,
            action_label: action.action_label,
            reason: action.reason,
        }
    }
}

/// Alerts/actions output: `entity_id, timestamp, score, segment,
/// [confidence], action_label, reason`.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertTable {
    pub has_confidence: bool,
    rows: Vec<AlertRow>,
}

impl AlertTable {
    pub fn new(has_confidence: bool) -> Self {
        Self {
            has_confidence,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: AlertRow) {
        self.rows.push(row);
    }

    /// Order rows by timestamp, then entity.
    pub fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| (a.timestamp, &a.entity_id).cmp(&(b.timestamp, &b.entity_id)));
    }

    pub fn rows(&self) -> &[AlertRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = ["entity_id", "timestamp", "score", "segment"]
            .into_iter()
            .map(String::from)
            .collect();
        if self.has_confidence {
            header.push("confidence".into());
        }
        header.push("action_label".into());
        header.push("reason".into());
        header
    }

    fn record(&self, row: &AlertRow) -> Vec<String> {
        let mut out = vec![
            row.entity_id.to_string(),
            timestamp(&row.timestamp),
            row.score.to_string(),
            row.segment.label.clone(),
        ];
        if self.has_confidence {
            out.push(cell(row.confidence));
        }
        out.push(row.action_label.clone());
        out.push(row.reason.clone());
        out
    }

    pub fn to_csv(&self) -> SinkResult<Vec<u8>> {
        encode(self.header(), self.rows.iter().map(|r| self.record(r)))
    }
}
