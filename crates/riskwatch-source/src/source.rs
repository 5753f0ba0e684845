//! The source trait and the in-memory source.

use riskwatch_types::RecordSet;

use crate::error::SourceResult;

/// Supplies timestamped records for one or more entities.
///
/// Records need not be sorted or partitioned; the pipeline does both.
pub trait SeriesSource: Send + Sync {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Metric columns every produced record carries.
    fn columns(&self) -> Vec<String>;

    /// Produce the full record set.
    fn load(&self) -> SourceResult<RecordSet>;
}

/// A fixed, in-memory record set.
#[derive(Clone, Debug)]
pub struct StaticSource {
    name: String,
    records: RecordSet,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, records: impl Into<RecordSet>) -> Self {
        Self {
            name: name.into(),
            records: records.into(),
        }
    }
}

impl SeriesSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> Vec<String> {
        self.records.columns().into_iter().collect()
    }

    fn load(&self) -> SourceResult<RecordSet> {
        Ok(self.records.clone())
    }
}
