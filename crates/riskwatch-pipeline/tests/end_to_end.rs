//! End-to-end runs through `ValidatedPipeline`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use riskwatch_action::ActionTable;
use riskwatch_pipeline::{
    AlertPolicy, AlertScope, FeatureConfig, PipelineConfig, PipelineError, Scenario,
    WindowDefaults,
};
use riskwatch_score::Calibration;
use riskwatch_segment::SegmentTable;
use riskwatch_sink::{
    DirectorySink, MemorySink, ReportOptions, ResultSink, ALERTS_FILE, REPORT_FILE, SCORED_FILE,
};
use riskwatch_source::{SeriesSource, StaticSource};
use riskwatch_types::{ConfigError, ErrorKind, Record, RecordSet};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// 26 records of `10.0` followed by one `20.0`, hourly.
fn flat_then_spike() -> RecordSet {
    (0..27)
        .map(|i| {
            let value = if i == 26 { 20.0 } else { 10.0 };
            Record::new("E1", t0() + Duration::hours(i)).with_metric("value", value)
        })
        .collect()
}

fn spike_config() -> PipelineConfig {
    PipelineConfig {
        window: WindowDefaults {
            window: 10,
            min_periods: 5,
        },
        features: vec![FeatureConfig::new("value_10", "value")],
        calibration: Calibration::z_score("value_10"),
        confidence: None,
        segments: SegmentTable::anomaly(2.0, 3.0).unwrap(),
        actions: ActionTable::anomaly(),
        alerts: AlertPolicy {
            floor: "HIGH".into(),
            scope: AlertScope::AllRows,
        },
        report: ReportOptions::default(),
        carry_columns: vec![],
    }
}

fn list_dir(path: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[test]
fn flat_series_then_spike() {
    let pipeline = spike_config().validate().unwrap();
    let output = pipeline.run(flat_then_spike()).unwrap();
    let rows = output.scored.rows();
    assert_eq!(rows.len(), 27);

    for row in &rows[..4] {
        assert!(row.features[0].is_none());
        assert_eq!(row.score, None);
        assert_eq!(row.segment, None);
    }
    for row in &rows[4..26] {
        let feature = row.features[0].unwrap();
        assert_eq!(feature.std, 0.0);
        assert_eq!(feature.mean, 10.0);
        assert_eq!(row.score, Some(0.0));
        assert_eq!(row.segment.as_ref().unwrap().label, "LOW");
    }

    let spike = &rows[26];
    assert_eq!(spike.features[0].unwrap().count, 10);
    // Window [10 x 9, 20]: mean 11, population std 3.
    assert_eq!(spike.score, Some(3.0));
    assert_eq!(spike.segment.as_ref().unwrap().label, "HIGH");

    let alerts = output.alerts.rows();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].entity_id.as_str(), "E1");
    assert_eq!(alerts[0].timestamp, t0() + Duration::hours(26));
    assert_eq!(alerts[0].action_label, "INVESTIGATE");
    assert_eq!(alerts[0].reason, "Anomalous spike (z=3.000)");

    assert_eq!(output.stats.records, 27);
    assert_eq!(output.stats.scored, 23);
    assert_eq!(output.stats.alerts, 1);
}

#[test]
fn scored_csv_marks_insufficient_window_as_empty() {
    let pipeline = spike_config().validate().unwrap();
    let output = pipeline.run(flat_then_spike()).unwrap();
    let csv = String::from_utf8(output.artifacts.scored_csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "entity_id,timestamp,value,value_10_mean,value_10_std,value_10_count,score,segment"
    );
    assert_eq!(lines[1], "E1,2025-01-01 00:00:00,10,,,,,");
    assert_eq!(lines[5], "E1,2025-01-01 04:00:00,10,10,0,5,0,LOW");
    assert_eq!(lines[27], "E1,2025-01-02 02:00:00,20,11,3,10,3,HIGH");
    assert_eq!(lines.len(), 28);
}

#[test]
fn alerts_sorted_by_timestamp_then_entity() {
    let mut records = Vec::new();
    for entity in ["B", "A"] {
        records.extend(flat_then_spike().records().iter().map(|r| {
            Record::new(entity, r.timestamp).with_metric("value", r.metric("value").unwrap())
        }));
    }
    let pipeline = spike_config().validate().unwrap();
    let output = pipeline.run(RecordSet::new(records)).unwrap();
    let ids: Vec<&str> = output.alerts.rows().iter().map(|a| a.entity_id.as_str()).collect();
    assert_eq!(ids, ["A", "B"]);
    assert!(output
        .scored
        .rows()
        .windows(2)
        .all(|w| (w[0].timestamp, &w[0].entity_id) <= (w[1].timestamp, &w[1].entity_id)));
}

#[test]
fn duplicate_keys_resolve_last_write_wins() {
    let mut records = flat_then_spike();
    records.push(Record::new("E1", t0() + Duration::hours(26)).with_metric("value", 10.0));
    let pipeline = spike_config().validate().unwrap();
    let output = pipeline.run(records).unwrap();
    assert_eq!(output.stats.duplicates_dropped, 1);
    assert_eq!(output.scored.len(), 27);
    assert_eq!(output.scored.rows()[26].score, Some(0.0));
    assert!(output.alerts.is_empty());
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn reruns_are_byte_identical() {
    for scenario in [Scenario::TimelinePrediction, Scenario::SeasonalSpikes] {
        let pipeline = scenario.config().unwrap().validate().unwrap();
        let source = scenario.source().build();
        let first = pipeline.run(source.load().unwrap()).unwrap();
        let second = pipeline.run(source.load().unwrap()).unwrap();
        assert_eq!(first.artifacts, second.artifacts, "{scenario}");
        assert!(first
            .artifacts
            .report_md
            .contains(&first.artifacts.scored_digest()));
    }
}

#[test]
fn different_seed_changes_output() {
    let scenario = Scenario::TimelinePrediction;
    let pipeline = scenario.config().unwrap().validate().unwrap();
    let a = pipeline.run(scenario.source().build().load().unwrap()).unwrap();
    let b = pipeline
        .run(scenario.source().with_seed(7).build().load().unwrap())
        .unwrap();
    assert_ne!(a.artifacts.scored_digest(), b.artifacts.scored_digest());
}

#[test]
fn timeline_scenario_reports_confidence_and_error() {
    let scenario = Scenario::TimelinePrediction;
    let pipeline = scenario.config().unwrap().validate().unwrap();
    let output = pipeline.run(scenario.source().build().load().unwrap()).unwrap();

    assert_eq!(output.stats.entities, 220);
    assert_eq!(output.stats.scored, 220);
    for row in output.scored.rows() {
        let score = row.score.unwrap();
        assert!((0.0..=18.0).contains(&score));
        let confidence = row.confidence.unwrap();
        assert!((0.3..=1.0).contains(&confidence));
    }
    for alert in output.alerts.rows() {
        assert_ne!(alert.segment.label, "ON_TIME");
        assert!(alert.reason.contains("confidence"));
    }
    assert!(output
        .artifacts
        .report_md
        .contains("- Mean absolute error vs `delay_h`: "));
    let header = String::from_utf8(output.artifacts.alerts_csv).unwrap();
    assert!(header.starts_with("entity_id,timestamp,score,segment,confidence,action_label,reason\n"));
}

#[test]
fn evolving_risk_alerts_latest_row_per_entity() {
    let scenario = Scenario::EvolvingRisk;
    let pipeline = scenario.config().unwrap().validate().unwrap();
    let output = pipeline.run(scenario.source().build().load().unwrap()).unwrap();

    assert_eq!(output.stats.entities, 120);
    let mut seen = std::collections::BTreeSet::new();
    for alert in output.alerts.rows() {
        assert!(seen.insert(alert.entity_id.clone()), "two alerts for one entity");
        assert!((0.0..=1.0).contains(&alert.score));
        assert_ne!(alert.segment.label, "LOW");
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_column_fails_before_any_output() {
    let mut records: Vec<Record> = flat_then_spike().records().to_vec();
    records[12] = Record::new("E1", records[12].timestamp).with_metric("other", 1.0);
    let source = StaticSource::new("broken", records);

    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(dir.path());
    let pipeline = spike_config().validate().unwrap();
    let err = pipeline.execute(&source, &sink).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(err.entity().map(|e| e.as_str()), Some("E1"));
    assert_eq!(err.column(), Some("value"));
    assert!(list_dir(dir.path()).is_empty());
}

#[test]
fn non_finite_value_is_a_schema_error() {
    let mut records: Vec<Record> = flat_then_spike().records().to_vec();
    records[3] = Record::new("E1", records[3].timestamp).with_metric("value", f64::NAN);
    let pipeline = spike_config().validate().unwrap();
    let err = pipeline.run(RecordSet::new(records)).unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)));
    assert_eq!(err.column(), Some("value"));
}

#[test]
fn failed_run_keeps_previous_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(dir.path());
    let pipeline = spike_config().validate().unwrap();
    let good = pipeline
        .execute(&StaticSource::new("good", flat_then_spike()), &sink)
        .unwrap();
    assert_eq!(list_dir(dir.path()), [ALERTS_FILE, REPORT_FILE, SCORED_FILE]);

    let broken = StaticSource::new("broken", vec![Record::new("E1", t0())]);
    assert!(pipeline.execute(&broken, &sink).is_err());
    assert_eq!(
        std::fs::read(dir.path().join(SCORED_FILE)).unwrap(),
        good.artifacts.scored_csv
    );
}

#[test]
fn config_errors_surface_with_kind() {
    let mut config = spike_config();
    config.window.min_periods = 10;
    let err = PipelineError::from(config.validate().unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.entity(), None);

    let mut config = spike_config();
    config.calibration = Calibration::z_score("nope");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnknownFeature { .. })
    ));

    let mut config = spike_config();
    config.actions.rules.retain(|r| r.segment != "MEDIUM");
    assert_eq!(
        config.validate().unwrap_err(),
        ConfigError::MissingActionRule("MEDIUM".into())
    );
}

#[test]
fn memory_sink_receives_rendered_report() {
    let pipeline = spike_config().validate().unwrap();
    let sink = MemorySink::new();
    pipeline
        .execute(&StaticSource::new("inline", flat_then_spike()), &sink)
        .unwrap();
    let artifacts = sink.artifacts().unwrap().unwrap();
    assert!(artifacts.report_md.contains("- Rows: 27\n"));
    assert!(artifacts.report_md.contains("- Unscored rows (insufficient window): 4\n"));
    assert!(artifacts.report_md.contains("| LOW | 22 |"));
    assert!(artifacts.report_md.contains("| HIGH | 1 |"));
    assert!(artifacts.report_md.contains("- Alerts (segment >= HIGH): 1\n"));

    // A sink is only a destination; writing the same artifacts again is harmless.
    sink.write(&artifacts).unwrap();
}
