//! Pipeline configuration and up-front validation.

use riskwatch_action::{ActionDeriver, ActionTable};
use riskwatch_score::{Calibration, ConfidenceModel, ScoreCalculator};
use riskwatch_segment::SegmentTable;
use riskwatch_sink::ReportOptions;
use riskwatch_types::{ConfigError, ConfigResult, Segment};
use riskwatch_window::{FeatureSpec, WindowedFeatureExtractor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pipeline-wide window width and minimum observation count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDefaults {
    pub window: usize,
    pub min_periods: usize,
}

/// One rolling feature; `window`/`min_periods` fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    pub column: String,
    #[serde(default)]
    pub window: Option<usize>,
    #[serde(default)]
    pub min_periods: Option<usize>,
}

impl FeatureConfig {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            window: None,
            min_periods: None,
        }
    }

    pub fn resolve(&self, defaults: &WindowDefaults) -> FeatureSpec {
        FeatureSpec::new(
            self.name.as_str(),
            self.column.as_str(),
            self.window.unwrap_or(defaults.window),
            self.min_periods.unwrap_or(defaults.min_periods),
        )
    }
}

/// Which scored rows become alerts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertScope {
    /// Every row at or above the floor.
    #[default]
    AllRows,
    /// Only each entity's latest scored row, if at or above the floor.
    LatestPerEntity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Least severe segment label that raises an alert.
    pub floor: String,
    #[serde(default)]
    pub scope: AlertScope,
}

/// Everything a run needs besides its records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub window: WindowDefaults,
    #[serde(default)]
    pub features: Vec<FeatureConfig>,
    pub calibration: Calibration,
    #[serde(default)]
    pub confidence: Option<ConfidenceModel>,
    pub segments: SegmentTable,
    pub actions: ActionTable,
    pub alerts: AlertPolicy,
    #[serde(default)]
    pub report: ReportOptions,
    /// Extra raw columns copied into the scored table.
    #[serde(default)]
    pub carry_columns: Vec<String>,
}

/// A configuration that passed every check, with its components built.
#[derive(Clone, Debug)]
pub struct ValidatedPipeline {
    pub(crate) config: PipelineConfig,
    pub(crate) extractor: WindowedFeatureExtractor,
    pub(crate) calculator: ScoreCalculator,
    pub(crate) deriver: ActionDeriver,
    pub(crate) floor: Segment,
    pub(crate) raw_columns: Vec<String>,
}

impl PipelineConfig {
    /// Check every cross-component constraint and build the components.
    ///
    /// Rejects `window <= min_periods`, unknown feature references, segment
    /// tables that leave part of the score domain uncovered, missing or
    /// duplicate action rules and an unknown alert floor.
    pub fn validate(self) -> ConfigResult<ValidatedPipeline> {
        // Defaults are checked even when every feature overrides them.
        FeatureSpec::new("window", "", self.window.window, self.window.min_periods).validate()?;
        let specs: Vec<FeatureSpec> = self
            .features
            .iter()
            .map(|f| f.resolve(&self.window))
            .collect();
        let extractor = WindowedFeatureExtractor::new(specs)?;
        let calculator = ScoreCalculator::new(
            self.calibration.clone(),
            self.confidence.clone(),
            extractor.specs(),
        )?;

        let domain = calculator.domain();
        self.segments.check_covers(domain.min, domain.max)?;
        let deriver = ActionDeriver::new(&self.actions, &self.segments)?;
        let floor = self.segments.segment(&self.alerts.floor)?;

        let mut raw_columns = extractor.required_columns();
        let extra = calculator
            .required_columns()
            .iter()
            .chain(&self.carry_columns)
            .chain(self.report.reference_column.iter());
        for column in extra {
            if column.is_empty() {
                return Err(ConfigError::InvalidParameter {
                    name: "carry_columns".into(),
                    detail: "column names must not be empty".into(),
                });
            }
            if !raw_columns.contains(column) {
                raw_columns.push(column.clone());
            }
        }

        debug!(
            features = extractor.specs().len(),
            calibration = calculator.calibration().style(),
            segments = self.segments.len(),
            columns = ?raw_columns,
            "validated pipeline configuration"
        );

        Ok(ValidatedPipeline {
            config: self,
            extractor,
            calculator,
            deriver,
            floor,
            raw_columns,
        })
    }
}

impl ValidatedPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Columns every input record must carry, in scored-table order.
    pub fn required_columns(&self) -> &[String] {
        &self.raw_columns
    }

    pub fn alert_floor(&self) -> &Segment {
        &self.floor
    }
}
