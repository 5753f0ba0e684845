//! The batch run: schema check, per-entity scoring, alerts, rendering.

use std::collections::BTreeMap;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use riskwatch_action::ActionContext;
use riskwatch_sink::{
    digest, AlertRow, AlertTable, Artifacts, FeatureCell, NarrativeReport, ResultSink, ScoredRow,
    ScoredTable,
};
use riskwatch_source::SeriesSource;
use riskwatch_types::{ConfigResult, EntityId, EntitySeries, RecordSet, SchemaResult};
use tracing::{debug, info, warn};

use crate::config::{AlertScope, ValidatedPipeline};
use crate::error::PipelineResult;

/// Counters of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Input records, before duplicate resolution.
    pub records: usize,
    pub entities: usize,
    pub duplicates_dropped: usize,
    pub scored: usize,
    pub alerts: usize,
}

/// Everything a run produced, tables and their rendered form.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub scored: ScoredTable,
    pub alerts: AlertTable,
    pub artifacts: Artifacts,
    pub stats: RunStats,
}

impl ValidatedPipeline {
    /// Score a record set entirely in memory.
    ///
    /// Every record is checked for the required columns before any feature
    /// is computed; a schema error aborts the run with no output.
    pub fn run(&self, records: RecordSet) -> PipelineResult<RunOutput> {
        let started = Instant::now();
        records.check_schema(&self.raw_columns)?;

        let total = records.len();
        let partitioned = records.partition();
        if partitioned.duplicates_dropped > 0 {
            warn!(
                dropped = partitioned.duplicates_dropped,
                "duplicate (entity_id, timestamp) records resolved last-write-wins"
            );
        }

        let mut scored = ScoredTable::new(
            self.raw_columns.clone(),
            self.extractor.specs().iter().map(|s| s.name.clone()).collect(),
            self.calculator.has_confidence(),
        );
        for rows in self.score_all(&partitioned.series) {
            scored.extend(rows?);
        }
        scored.sort();

        let alerts = self.alerts(&scored)?;
        let artifacts = self.render(&scored, &alerts)?;

        let stats = RunStats {
            records: total,
            entities: partitioned.series.len(),
            duplicates_dropped: partitioned.duplicates_dropped,
            scored: scored.scored_count(),
            alerts: alerts.len(),
        };
        info!(
            records = stats.records,
            entities = stats.entities,
            scored = stats.scored,
            alerts = stats.alerts,
            calibration = self.calculator.calibration().style(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run complete"
        );

        Ok(RunOutput {
            scored,
            alerts,
            artifacts,
            stats,
        })
    }

    /// Load from `source`, run, and hand the artifacts to `sink` in one write.
    pub fn execute(
        &self,
        source: &dyn SeriesSource,
        sink: &dyn ResultSink,
    ) -> PipelineResult<RunOutput> {
        let records = source.load()?;
        info!(source = source.name(), records = records.len(), "loaded records");
        let output = self.run(records)?;
        sink.write(&output.artifacts)?;
        Ok(output)
    }

    #[cfg(feature = "parallel")]
    fn score_all(&self, series: &[EntitySeries]) -> Vec<SchemaResult<Vec<ScoredRow>>> {
        series.par_iter().map(|s| self.score_series(s)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn score_all(&self, series: &[EntitySeries]) -> Vec<SchemaResult<Vec<ScoredRow>>> {
        series.iter().map(|s| self.score_series(s)).collect()
    }

    fn score_series(&self, series: &EntitySeries) -> SchemaResult<Vec<ScoredRow>> {
        let features = self.extractor.extract(series)?;
        let segments = &self.config.segments;

        let rows = series
            .records
            .iter()
            .zip(features)
            .map(|(record, row)| {
                let raw = self
                    .raw_columns
                    .iter()
                    .map(|c| record.require(c))
                    .collect::<SchemaResult<Vec<f64>>>()?;
                let score = self.calculator.evaluate(record, &row)?;
                let confidence = match score {
                    Some(_) => self.calculator.confidence(record, &row)?,
                    None => None,
                };
                Ok(ScoredRow {
                    entity_id: record.entity_id.clone(),
                    timestamp: record.timestamp,
                    raw,
                    features: row
                        .features
                        .iter()
                        .map(|f| f.as_ref().map(FeatureCell::from))
                        .collect(),
                    confidence,
                    score,
                    segment: score.map(|s| segments.classify(s)),
                })
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        debug!(
            entity = %series.entity_id,
            records = rows.len(),
            scored = rows.iter().filter(|r| r.score.is_some()).count(),
            "scored entity"
        );
        Ok(rows)
    }

    fn alerts(&self, scored: &ScoredTable) -> ConfigResult<AlertTable> {
        let candidates: Vec<&ScoredRow> = match self.config.alerts.scope {
            AlertScope::AllRows => scored.rows().iter().collect(),
            AlertScope::LatestPerEntity => {
                // Rows are in timestamp order, so the last insert per entity wins.
                let mut latest: BTreeMap<&EntityId, &ScoredRow> = BTreeMap::new();
                for row in scored.rows().iter().filter(|r| r.score.is_some()) {
                    latest.insert(&row.entity_id, row);
                }
                latest.into_values().collect()
            }
        };

        let mut alerts = AlertTable::new(self.calculator.has_confidence());
        for row in candidates {
            let (Some(score), Some(segment)) = (row.score, row.segment.as_ref()) else {
                continue;
            };
            if !segment.at_least(&self.floor) {
                continue;
            }
            let context = ActionContext {
                score: Some(score),
                confidence: row.confidence,
            };
            let action = self
                .deriver
                .derive(&row.entity_id, row.timestamp, segment, context)?;
            alerts.push(AlertRow::from_action(action, score, row.confidence));
        }
        alerts.sort();
        Ok(alerts)
    }

    fn render(&self, scored: &ScoredTable, alerts: &AlertTable) -> PipelineResult<Artifacts> {
        let scored_csv = scored.to_csv()?;
        let alerts_csv = alerts.to_csv()?;
        let scored_digest = digest(&scored_csv);
        let segments = self.config.segments.segments();
        let report_md = NarrativeReport {
            options: &self.config.report,
            scored,
            alerts,
            segments: &segments,
            alert_floor: &self.floor,
            scored_digest: &scored_digest,
        }
        .render();

        Ok(Artifacts {
            scored_csv,
            alerts_csv,
            report_md,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlertPolicy, FeatureConfig, PipelineConfig, WindowDefaults};
    use chrono::{Duration, TimeZone, Utc};
    use riskwatch_action::ActionTable;
    use riskwatch_score::Calibration;
    use riskwatch_segment::SegmentTable;
    use riskwatch_sink::{MemorySink, ReportOptions};
    use riskwatch_source::StaticSource;
    use riskwatch_types::Record;

    fn config(scope: AlertScope) -> PipelineConfig {
        PipelineConfig {
            window: WindowDefaults {
                window: 4,
                min_periods: 2,
            },
            features: vec![FeatureConfig::new("v", "value")],
            calibration: Calibration::z_score("v"),
            confidence: None,
            segments: SegmentTable::anomaly(1.0, 1.5).unwrap(),
            actions: ActionTable::anomaly(),
            alerts: AlertPolicy {
                floor: "MEDIUM".into(),
                scope,
            },
            report: ReportOptions::default(),
            carry_columns: vec![],
        }
    }

    fn records(values: &[(&str, f64)]) -> RecordSet {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, (entity, v))| {
                Record::new(*entity, start + Duration::hours(i as i64)).with_metric("value", *v)
            })
            .collect()
    }

    #[test]
    fn latest_per_entity_keeps_one_row_each() {
        let input = records(&[
            ("A", 1.0),
            ("A", 1.0),
            ("A", 9.0),
            ("A", 9.0),
            ("B", 1.0),
            ("B", 1.0),
            ("B", 1.0),
            ("A", 30.0),
        ]);
        let all = config(AlertScope::AllRows).validate().unwrap();
        let latest = config(AlertScope::LatestPerEntity).validate().unwrap();

        let all_alerts = all.run(input.clone()).unwrap().alerts;
        let latest_alerts = latest.run(input).unwrap().alerts;
        assert!(all_alerts.len() >= latest_alerts.len());
        assert_eq!(latest_alerts.len(), 1);
        assert_eq!(latest_alerts.rows()[0].entity_id.as_str(), "A");
        assert_eq!(latest_alerts.rows()[0].segment.label, "HIGH");
        assert_eq!(
            latest_alerts.rows()[0].timestamp,
            all_alerts.rows()[all_alerts.len() - 1].timestamp
        );
    }

    #[test]
    fn execute_writes_once_to_sink() {
        let pipeline = config(AlertScope::AllRows).validate().unwrap();
        let source = StaticSource::new("inline", records(&[("A", 1.0), ("A", 2.0), ("A", 3.0)]));
        let sink = MemorySink::new();
        let output = pipeline.execute(&source, &sink).unwrap();
        assert_eq!(sink.artifacts().unwrap(), Some(output.artifacts.clone()));
        assert_eq!(output.stats.records, 3);
        assert_eq!(output.stats.entities, 1);
        assert_eq!(output.stats.scored, 2);
    }

    #[test]
    fn empty_input_renders_headers() {
        let pipeline = config(AlertScope::AllRows).validate().unwrap();
        let output = pipeline.run(RecordSet::default()).unwrap();
        let csv = String::from_utf8(output.artifacts.scored_csv).unwrap();
        assert_eq!(
            csv,
            "entity_id,timestamp,value,v_mean,v_std,v_count,score,segment\n"
        );
        assert!(output.alerts.is_empty());
        assert_eq!(output.stats, RunStats::default());
    }
}
