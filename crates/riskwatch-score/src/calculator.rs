//! Calibration bound to a concrete feature layout.

use riskwatch_types::{ConfigError, ConfigResult, Record, SchemaResult, Score};
use riskwatch_window::{FeatureRow, FeatureSpec};
use tracing::debug;

use crate::calibration::{Calibration, ConfidenceModel, Input, ScoreDomain, Term, Transform};

/// Term input resolved to a feature position or a raw column.
#[derive(Clone, Debug)]
enum Source {
    Feature(usize),
    Column(String),
}

#[derive(Clone, Debug)]
struct ResolvedTerm {
    source: Source,
    weight: f64,
    transform: Transform,
}

#[derive(Clone, Debug)]
enum Resolved {
    ZScore {
        feature: usize,
        column: String,
        two_sided: bool,
    },
    Logistic {
        terms: Vec<ResolvedTerm>,
        bias: f64,
    },
    Clipped {
        terms: Vec<ResolvedTerm>,
        bias: f64,
        min: f64,
        max: f64,
    },
}

/// Scores records given their feature rows.
///
/// Built once per run from a validated calibration; every feature name is
/// resolved to a position up front so scoring never fails on configuration.
#[derive(Clone, Debug)]
pub struct ScoreCalculator {
    calibration: Calibration,
    resolved: Resolved,
    confidence: Option<(ConfidenceModel, Vec<ResolvedTerm>)>,
    columns: Vec<String>,
}

impl ScoreCalculator {
    pub fn new(
        calibration: Calibration,
        confidence: Option<ConfidenceModel>,
        features: &[FeatureSpec],
    ) -> ConfigResult<Self> {
        calibration.validate()?;
        let mut columns = Vec::new();

        let resolved = match &calibration {
            Calibration::ZScore { feature, two_sided } => {
                let index = position(features, feature, "z_score calibration")?;
                let column = features[index].column.clone();
                push_unique(&mut columns, &column);
                Resolved::ZScore {
                    feature: index,
                    column,
                    two_sided: *two_sided,
                }
            }
            Calibration::Logistic { terms, bias } => Resolved::Logistic {
                terms: resolve_terms(terms, features, "logistic calibration", &mut columns)?,
                bias: *bias,
            },
            Calibration::ClippedLinear {
                terms,
                bias,
                min,
                max,
            } => Resolved::Clipped {
                terms: resolve_terms(terms, features, "clipped_linear calibration", &mut columns)?,
                bias: *bias,
                min: *min,
                max: *max,
            },
        };

        let confidence = match confidence {
            Some(model) => {
                model.validate()?;
                let terms =
                    resolve_terms(&model.terms, features, "confidence model", &mut columns)?;
                Some((model, terms))
            }
            None => None,
        };

        debug!(
            style = calibration.style(),
            columns = ?columns,
            confidence = confidence.is_some(),
            "resolved score calibration"
        );

        Ok(Self {
            calibration,
            resolved,
            confidence,
            columns,
        })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn domain(&self) -> ScoreDomain {
        self.calibration.domain()
    }

    pub fn has_confidence(&self) -> bool {
        self.confidence.is_some()
    }

    /// Raw columns read directly from records (beyond the feature sources).
    pub fn required_columns(&self) -> &[String] {
        &self.columns
    }

    /// Score value for one record, `None` while a required feature is undefined.
    ///
    /// The result is always finite and inside [`domain`](Self::domain).
    pub fn evaluate(&self, record: &Record, row: &FeatureRow) -> SchemaResult<Option<f64>> {
        match &self.resolved {
            Resolved::ZScore {
                feature,
                column,
                two_sided,
            } => {
                let Some(f) = row.get(*feature) else {
                    return Ok(None);
                };
                let raw = record.require(column)?;
                let z = z_score(raw, f.mean, f.std);
                Ok(Some(if *two_sided { z.abs() } else { z }))
            }
            Resolved::Logistic { terms, bias } => {
                Ok(linear(terms, *bias, record, row)?.map(|x| logistic(x).clamp(0.0, 1.0)))
            }
            Resolved::Clipped {
                terms,
                bias,
                min,
                max,
            } => Ok(linear(terms, *bias, record, row)?.map(|x| x.clamp(*min, *max))),
        }
    }

    /// Typed score for one record.
    pub fn score(&self, record: &Record, row: &FeatureRow) -> SchemaResult<Option<Score>> {
        Ok(self
            .evaluate(record, row)?
            .map(|v| Score::new(record.entity_id.clone(), record.timestamp, v)))
    }

    /// Confidence for one record, `None` without a model or while inputs are undefined.
    pub fn confidence(&self, record: &Record, row: &FeatureRow) -> SchemaResult<Option<f64>> {
        let Some((model, terms)) = &self.confidence else {
            return Ok(None);
        };
        Ok(linear(terms, 0.0, record, row)?.map(|p| model.from_penalty(p)))
    }
}

/// `(raw − mean) / std`, never infinite.
///
/// Scores `0` when the window is flat, i.e. `std` is zero or below the
/// rounding resolution of `mean`. Small-scale signals keep their z-score.
pub fn z_score(raw: f64, mean: f64, std: f64) -> f64 {
    if std <= f64::EPSILON * mean.abs() {
        return 0.0;
    }
    ((raw - mean) / std).clamp(-f64::MAX, f64::MAX)
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn linear(
    terms: &[ResolvedTerm],
    bias: f64,
    record: &Record,
    row: &FeatureRow,
) -> SchemaResult<Option<f64>> {
    let mut acc = bias;
    for term in terms {
        let x = match &term.source {
            Source::Feature(i) => match row.get(*i) {
                Some(f) => f.mean,
                None => return Ok(None),
            },
            Source::Column(c) => record.require(c)?,
        };
        acc += term.weight * term.transform.apply(x);
    }
    // Opposing infinite contributions cancel to NaN; treat as no signal.
    Ok(Some(if acc.is_nan() { bias } else { acc }))
}

fn position(features: &[FeatureSpec], name: &str, context: &str) -> ConfigResult<usize> {
    features
        .iter()
        .position(|f| f.name == name)
        .ok_or_else(|| ConfigError::UnknownFeature {
            context: context.to_string(),
            feature: name.to_string(),
        })
}

fn push_unique(columns: &mut Vec<String>, column: &str) {
    if !columns.iter().any(|c| c == column) {
        columns.push(column.to_string());
    }
}

fn resolve_terms(
    terms: &[Term],
    features: &[FeatureSpec],
    context: &str,
    columns: &mut Vec<String>,
) -> ConfigResult<Vec<ResolvedTerm>> {
    terms
        .iter()
        .map(|t| {
            let source = match &t.input {
                Input::Feature(name) => Source::Feature(position(features, name, context)?),
                Input::Column(column) => {
                    push_unique(columns, column);
                    Source::Column(column.clone())
                }
            };
            Ok(ResolvedTerm {
                source,
                weight: t.weight,
                transform: t.transform,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use riskwatch_types::WindowedFeature;

    fn feature(name: &str, mean: f64, std: f64) -> WindowedFeature {
        WindowedFeature {
            name: name.into(),
            entity_id: "E1".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            window_size: 10,
            mean,
            std,
            count_in_window: 10,
        }
    }

    fn record(value: f64) -> Record {
        Record::new("E1", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .with_metric("value", value)
            .with_metric("retries", 2.0)
            .with_metric("cpu", 0.8)
    }

    fn specs() -> Vec<FeatureSpec> {
        vec![
            FeatureSpec::new("v", "value", 10, 5),
            FeatureSpec::new("inc", "incidents", 14, 4),
        ]
    }

    #[test]
    fn z_score_against_own_column() {
        let calc = ScoreCalculator::new(Calibration::z_score("v"), None, &specs()).unwrap();
        let row = FeatureRow {
            features: vec![Some(feature("v", 11.0, 3.0)), None],
        };
        assert_eq!(calc.evaluate(&record(20.0), &row).unwrap(), Some(3.0));
        assert_eq!(calc.required_columns(), &["value".to_string()]);
    }

    #[test]
    fn flat_window_scores_exactly_zero() {
        let calc = ScoreCalculator::new(Calibration::z_score("v"), None, &specs()).unwrap();
        let row = FeatureRow {
            features: vec![Some(feature("v", 10.0, 0.0)), None],
        };
        assert_eq!(calc.evaluate(&record(25.0), &row).unwrap(), Some(0.0));
        // Residue far below the resolution of the mean is still flat.
        assert_eq!(z_score(1_000.5, 1_000.0, 1e-14), 0.0);
    }

    #[test]
    fn small_scale_variation_is_scored() {
        let z = z_score(3e-17, 1e-17, 1e-17);
        assert!((z - 2.0).abs() < 1e-9, "z = {z}");
        let z = z_score(1.0, 0.0, f64::EPSILON / 2.0);
        assert!(z.is_finite() && z > 1e15);
    }

    #[test]
    fn two_sided_uses_magnitude() {
        let cal = Calibration::ZScore {
            feature: "v".into(),
            two_sided: true,
        };
        let calc = ScoreCalculator::new(cal, None, &specs()).unwrap();
        let row = FeatureRow {
            features: vec![Some(feature("v", 10.0, 2.0)), None],
        };
        assert_eq!(calc.evaluate(&record(4.0), &row).unwrap(), Some(3.0));
    }

    #[test]
    fn undefined_feature_is_not_scored() {
        let calc = ScoreCalculator::new(Calibration::z_score("v"), None, &specs()).unwrap();
        let row = FeatureRow {
            features: vec![None, None],
        };
        assert_eq!(calc.evaluate(&record(20.0), &row).unwrap(), None);
        assert!(calc.score(&record(20.0), &row).unwrap().is_none());
    }

    #[test]
    fn logistic_combination() {
        let cal = Calibration::logistic(vec![Term::feature("inc", 2.2), Term::feature("v", 0.9)]);
        let calc = ScoreCalculator::new(cal, None, &specs()).unwrap();
        let row = FeatureRow {
            features: vec![Some(feature("v", 0.5, 0.1)), Some(feature("inc", 0.25, 0.4))],
        };
        let expected = 1.0 / (1.0 + (-(2.2 * 0.25 + 0.9 * 0.5f64)).exp());
        let got = calc.evaluate(&record(0.0), &row).unwrap().unwrap();
        assert!((got - expected).abs() < 1e-12);

        let partial = FeatureRow {
            features: vec![Some(feature("v", 0.5, 0.1)), None],
        };
        assert_eq!(calc.evaluate(&record(0.0), &partial).unwrap(), None);
    }

    #[test]
    fn clipped_linear_stays_in_bounds() {
        let cal = Calibration::clipped_linear(
            vec![
                Term::column("retries", 10.0),
                Term::column("cpu", 5.0).with_transform(Transform::Hinge { knee: 0.65 }),
            ],
            0.0,
            18.0,
        );
        let calc = ScoreCalculator::new(cal, None, &specs()).unwrap();
        let row = FeatureRow {
            features: vec![None, None],
        };
        // Only raw columns: scored even with undefined features.
        assert_eq!(calc.evaluate(&record(0.0), &row).unwrap(), Some(18.0));
        assert_eq!(
            calc.required_columns(),
            &["retries".to_string(), "cpu".to_string()]
        );
    }

    #[test]
    fn confidence_from_raw_columns() {
        let model = ConfidenceModel::new(
            vec![
                Term::column("retries", 0.12),
                Term::column("cpu", 0.22).with_transform(Transform::Hinge { knee: 0.7 }),
            ],
            0.7,
        );
        let calc =
            ScoreCalculator::new(Calibration::z_score("v"), Some(model), &specs()).unwrap();
        let row = FeatureRow {
            features: vec![None, None],
        };
        let c = calc.confidence(&record(0.0), &row).unwrap().unwrap();
        assert!((c - (1.0 - (0.24 + 0.022))).abs() < 1e-12);
        assert!(calc.has_confidence());
    }

    #[test]
    fn missing_raw_column_is_schema_error() {
        let cal = Calibration::clipped_linear(vec![Term::column("queue", 1.0)], 0.0, 18.0);
        let calc = ScoreCalculator::new(cal, None, &specs()).unwrap();
        let row = FeatureRow { features: vec![] };
        let err = calc.evaluate(&record(0.0), &row).unwrap_err();
        assert_eq!(err.column(), "queue");
    }

    #[test]
    fn unknown_feature_rejected() {
        let err = ScoreCalculator::new(Calibration::z_score("nope"), None, &specs()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFeature { ref feature, .. } if feature == "nope"));
    }
}
