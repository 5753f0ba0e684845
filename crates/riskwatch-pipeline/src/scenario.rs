//! Built-in scenarios: a seeded source plus a matching pipeline configuration.

use std::fmt;
use std::str::FromStr;

use riskwatch_action::ActionTable;
use riskwatch_score::{Calibration, ConfidenceModel, Term, Transform};
use riskwatch_segment::SegmentTable;
use riskwatch_sink::ReportOptions;
use riskwatch_source::{EntityHistory, JobTimeline, SeasonalSpikes, SeriesSource, SyntheticEvents};
use riskwatch_types::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

use crate::config::{AlertPolicy, AlertScope, FeatureConfig, PipelineConfig, WindowDefaults};

/// Serializable choice of synthetic source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    SyntheticEvents(SyntheticEvents),
    EntityHistory(EntityHistory),
    JobTimeline(JobTimeline),
    SeasonalSpikes(SeasonalSpikes),
}

impl SourceConfig {
    pub fn build(&self) -> Box<dyn SeriesSource> {
        match self {
            Self::SyntheticEvents(s) => Box::new(s.clone()),
            Self::EntityHistory(s) => Box::new(s.clone()),
            Self::JobTimeline(s) => Box::new(s.clone()),
            Self::SeasonalSpikes(s) => Box::new(s.clone()),
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            Self::SyntheticEvents(s) => s.seed,
            Self::EntityHistory(s) => s.seed,
            Self::JobTimeline(s) => s.seed,
            Self::SeasonalSpikes(s) => s.seed,
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        match self {
            Self::SyntheticEvents(s) => Self::SyntheticEvents(s.with_seed(seed)),
            Self::EntityHistory(s) => Self::EntityHistory(s.with_seed(seed)),
            Self::JobTimeline(s) => Self::JobTimeline(s.with_seed(seed)),
            Self::SeasonalSpikes(s) => Self::SeasonalSpikes(s.with_seed(seed)),
        }
    }
}

/// The demo pipelines shipped with the binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    EventEarlyWarning,
    EvolvingRisk,
    TimelinePrediction,
    SeasonalSpikes,
}

impl Scenario {
    pub fn all() -> [Scenario; 4] {
        [
            Self::EventEarlyWarning,
            Self::EvolvingRisk,
            Self::TimelinePrediction,
            Self::SeasonalSpikes,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EventEarlyWarning => "event-early-warning",
            Self::EvolvingRisk => "evolving-risk",
            Self::TimelinePrediction => "timeline-prediction",
            Self::SeasonalSpikes => "seasonal-spikes",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Self::EventEarlyWarning => "events",
            Self::EvolvingRisk => "risk",
            Self::TimelinePrediction => "timeline",
            Self::SeasonalSpikes => "seasonal",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::EventEarlyWarning => {
                "hourly asset telemetry, rolling 48h z-score, alert on |z| >= 3"
            }
            Self::EvolvingRisk => {
                "daily account history, logistic risk over 14-day incident rate and behavior"
            }
            Self::TimelinePrediction => {
                "batch jobs, predicted delay hours from execution signals, with confidence"
            }
            Self::SeasonalSpikes => "single trending seasonal series, rolling 24h two-sided z-score",
        }
    }

    pub fn source(&self) -> SourceConfig {
        match self {
            Self::EventEarlyWarning => SourceConfig::SyntheticEvents(SyntheticEvents::default()),
            Self::EvolvingRisk => SourceConfig::EntityHistory(EntityHistory::default()),
            Self::TimelinePrediction => SourceConfig::JobTimeline(JobTimeline::default()),
            Self::SeasonalSpikes => SourceConfig::SeasonalSpikes(SeasonalSpikes::default()),
        }
    }

    /// Default pipeline configuration. Table presets are built from
    /// constants, so a failure here is a programming error surfaced as
    /// [`ConfigError`].
    pub fn config(&self) -> ConfigResult<PipelineConfig> {
        match self {
            Self::EventEarlyWarning => Ok(z_score_config(
                "Event early warning",
                ("value_48h", 48, 24),
                SegmentTable::anomaly(2.0, 3.0)?,
            )),
            Self::SeasonalSpikes => Ok(z_score_config(
                "Seasonal spikes",
                ("value_24h", 24, 12),
                SegmentTable::anomaly(2.0, 3.0)?,
            )),
            Self::EvolvingRisk => Ok(PipelineConfig {
                window: WindowDefaults {
                    window: 14,
                    min_periods: 4,
                },
                features: vec![
                    FeatureConfig::new("inc_rate", "incidents"),
                    FeatureConfig::new("beh", "behavior_index"),
                ],
                calibration: Calibration::logistic(vec![
                    Term::feature("inc_rate", 2.2),
                    Term::feature("beh", 0.9),
                ]),
                confidence: None,
                segments: SegmentTable::risk(0.35, 0.65)?,
                actions: ActionTable::risk(),
                alerts: AlertPolicy {
                    floor: "MEDIUM".into(),
                    scope: AlertScope::LatestPerEntity,
                },
                report: ReportOptions {
                    title: "Evolving risk scoring".into(),
                    ..ReportOptions::default()
                },
                carry_columns: vec!["activity".into()],
            }),
            Self::TimelinePrediction => timeline_config(),
        }
    }
}

fn z_score_config(
    title: &str,
    (feature, window, min_periods): (&str, usize, usize),
    segments: SegmentTable,
) -> PipelineConfig {
    PipelineConfig {
        window: WindowDefaults {
            window,
            min_periods,
        },
        features: vec![FeatureConfig::new(feature, "value")],
        calibration: Calibration::ZScore {
            feature: feature.into(),
            two_sided: true,
        },
        confidence: None,
        segments,
        actions: ActionTable::anomaly(),
        alerts: AlertPolicy {
            floor: "HIGH".into(),
            scope: AlertScope::AllRows,
        },
        report: ReportOptions {
            title: title.into(),
            ..ReportOptions::default()
        },
        carry_columns: vec![],
    }
}

/// Predicted delay hours: `0.35 · risk`, clipped to `[0, 18]`, where risk
/// weighs queue wait, retries, CPU pressure above 65 % and log data volume
/// above 60 GB. The `0.35` factor is folded into the weights.
fn timeline_config() -> ConfigResult<PipelineConfig> {
    const SCALE: f64 = 0.35;
    Ok(PipelineConfig {
        // Every input is a raw column of the job itself; no rolling features.
        window: WindowDefaults {
            window: 2,
            min_periods: 1,
        },
        features: vec![],
        calibration: Calibration::clipped_linear(
            vec![
                Term::column("queue_wait_h", SCALE * 0.55),
                Term::column("retries", SCALE * 0.75),
                Term::column("cpu_pressure", SCALE * 5.0)
                    .with_transform(Transform::Hinge { knee: 0.65 }),
                Term::column("data_gb", SCALE * 0.9)
                    .with_transform(Transform::Log1pHinge { knee: 60.0 }),
            ],
            0.0,
            18.0,
        ),
        confidence: Some(ConfidenceModel::new(
            vec![
                Term::column("retries", 0.12),
                Term::column("queue_wait_h", 0.10 / 6.0),
                Term::column("cpu_pressure", 0.22).with_transform(Transform::Hinge { knee: 0.7 }),
            ],
            0.7,
        )),
        segments: SegmentTable::delay([1.0, 3.0, 6.0], 18.0)?,
        actions: ActionTable::delay(),
        alerts: AlertPolicy {
            floor: "MINOR".into(),
            scope: AlertScope::AllRows,
        },
        report: ReportOptions {
            title: "Timeline prediction".into(),
            reference_column: Some("delay_h".into()),
            ..ReportOptions::default()
        },
        carry_columns: vec!["planned_duration_h".into(), "actual_duration_h".into()],
    })
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::all()
            .into_iter()
            .find(|sc| sc.name() == wanted || sc.alias() == wanted)
            .ok_or_else(|| ConfigError::InvalidParameter {
                name: "scenario".into(),
                detail: format!(
                    "unknown scenario '{s}', expected one of: {}",
                    Self::all().map(|sc| sc.name()).join(", ")
                ),
            })
    }
}
