//! Input records and per-entity partitioning.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

// ── Entity Identification ───────────────────────────────────────────────

/// The unit a time series is tracked per (an asset, an account, a job).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Output tables are keyed by `(entity_id, timestamp)`.
pub type RecordKey = (EntityId, DateTime<Utc>);

// ── Record ──────────────────────────────────────────────────────────────

/// One timestamped observation for one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub entity_id: EntityId,
    /// Named metric fields, e.g. `value`, `incidents`, `queue_wait_h`.
    pub metrics: BTreeMap<String, f64>,
}

impl Record {
    /// Create a record with no metrics.
    pub fn new(entity_id: impl Into<EntityId>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            entity_id: entity_id.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric insertion.
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Metric value, if present.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Metric value that must be present and finite.
    pub fn require(&self, column: &str) -> SchemaResult<f64> {
        match self.metrics.get(column) {
            None => Err(SchemaError::MissingColumn {
                entity: self.entity_id.clone(),
                timestamp: self.timestamp,
                column: column.to_string(),
            }),
            Some(v) if !v.is_finite() => Err(SchemaError::NonFiniteValue {
                entity: self.entity_id.clone(),
                timestamp: self.timestamp,
                column: column.to_string(),
                value: *v,
            }),
            Some(v) => Ok(*v),
        }
    }

    pub fn key(&self) -> RecordKey {
        (self.entity_id.clone(), self.timestamp)
    }
}

// ── Entity Series ───────────────────────────────────────────────────────

/// All records of one entity, in ascending timestamp order, one per timestamp.
#[derive(Clone, Debug)]
pub struct EntitySeries {
    pub entity_id: EntityId,
    pub records: Vec<Record>,
}

impl EntitySeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of splitting a record set by entity.
#[derive(Clone, Debug)]
pub struct Partitioned {
    /// One series per entity, ordered by entity id.
    pub series: Vec<EntitySeries>,
    /// Number of records dropped because a later record had the same key.
    pub duplicates_dropped: usize,
}

// ── Record Set ──────────────────────────────────────────────────────────

/// The ordered input of one pipeline run.
#[derive(Clone, Debug, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Union of metric names across all records, sorted.
    pub fn columns(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .flat_map(|r| r.metrics.keys().cloned())
            .collect()
    }

    /// Check every record carries every required column with a finite value.
    ///
    /// Fails on the first offending record in input order.
    pub fn check_schema<S: AsRef<str>>(&self, required: &[S]) -> SchemaResult<()> {
        for record in &self.records {
            for column in required {
                record.require(column.as_ref())?;
            }
        }
        Ok(())
    }

    /// Split by entity, order each series by timestamp and resolve duplicate
    /// `(entity_id, timestamp)` keys last-write-wins.
    pub fn partition(self) -> Partitioned {
        let mut by_entity: BTreeMap<EntityId, Vec<Record>> = BTreeMap::new();
        for record in self.records {
            by_entity
                .entry(record.entity_id.clone())
                .or_default()
                .push(record);
        }

        let mut duplicates_dropped = 0;
        let series = by_entity
            .into_iter()
            .map(|(entity_id, mut records)| {
                // Stable: equal timestamps keep input order, so the last one wins below.
                records.sort_by_key(|r| r.timestamp);
                let mut deduped: Vec<Record> = Vec::with_capacity(records.len());
                for record in records {
                    match deduped.last_mut() {
                        Some(last) if last.timestamp == record.timestamp => {
                            *last = record;
                            duplicates_dropped += 1;
                        }
                        _ => deduped.push(record),
                    }
                }
                EntitySeries {
                    entity_id,
                    records: deduped,
                }
            })
            .collect();

        Partitioned {
            series,
            duplicates_dropped,
        }
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
