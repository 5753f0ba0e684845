//! Score calibration definitions.
//!
//! A calibration is pure data: which inputs it reads, how they are weighted
//! and how the combined value is bounded. Resolution against the configured
//! features happens in [`ScoreCalculator`](crate::ScoreCalculator).

use riskwatch_types::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

// ── Inputs and Transforms ───────────────────────────────────────────────

/// Where a term reads its value from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// Window mean of a named feature.
    Feature(String),
    /// Raw value of a column on the current record.
    Column(String),
}

/// Shaping applied to a term's input before weighting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Identity,
    /// `max(x - knee, 0)`
    Hinge { knee: f64 },
    /// `max(ln(1 + x) - ln(1 + knee), 0)`
    Log1pHinge { knee: f64 },
}

impl Transform {
    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            Self::Identity => x,
            Self::Hinge { knee } => (x - knee).max(0.0),
            Self::Log1pHinge { knee } => (x.ln_1p() - knee.ln_1p()).max(0.0),
        }
    }

    fn is_finite(&self) -> bool {
        match *self {
            Self::Identity => true,
            Self::Hinge { knee } => knee.is_finite(),
            Self::Log1pHinge { knee } => knee.is_finite() && knee > -1.0,
        }
    }
}

/// One weighted input of a linear combination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub input: Input,
    pub weight: f64,
    #[serde(default)]
    pub transform: Transform,
}

impl Term {
    /// Term over a feature's window mean.
    pub fn feature(name: impl Into<String>, weight: f64) -> Self {
        Self {
            input: Input::Feature(name.into()),
            weight,
            transform: Transform::Identity,
        }
    }

    /// Term over a raw record column.
    pub fn column(name: impl Into<String>, weight: f64) -> Self {
        Self {
            input: Input::Column(name.into()),
            weight,
            transform: Transform::Identity,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    fn validate(&self, context: &str) -> ConfigResult<()> {
        if !self.weight.is_finite() {
            return Err(ConfigError::InvalidCalibration(format!(
                "{context}: weight {} is not finite",
                self.weight
            )));
        }
        if !self.transform.is_finite() {
            return Err(ConfigError::InvalidCalibration(format!(
                "{context}: transform {:?} has an invalid knee",
                self.transform
            )));
        }
        Ok(())
    }
}

// ── Score Domain ────────────────────────────────────────────────────────

/// Closed interval every score of a calibration falls in.
///
/// Infinite bounds mean the score is unbounded on that side.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreDomain {
    pub min: f64,
    pub max: f64,
}

impl ScoreDomain {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub const UNIT: Self = Self { min: 0.0, max: 1.0 };

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

// ── Calibration ─────────────────────────────────────────────────────────

/// How features combine into a score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum Calibration {
    /// `(raw - mean) / std` of one feature against its own source column.
    ///
    /// A flat window (`std` zero relative to `mean`) scores `0`. With
    /// `two_sided` the magnitude `|z|` is used so drops alert like spikes.
    ZScore {
        feature: String,
        #[serde(default)]
        two_sided: bool,
    },
    /// `σ(bias + Σ wᵢ·tᵢ)`, clipped to `[0, 1]`.
    Logistic {
        terms: Vec<Term>,
        #[serde(default)]
        bias: f64,
    },
    /// `clip(bias + Σ wᵢ·tᵢ, min, max)`.
    ClippedLinear {
        terms: Vec<Term>,
        #[serde(default)]
        bias: f64,
        min: f64,
        max: f64,
    },
}

impl Calibration {
    pub fn z_score(feature: impl Into<String>) -> Self {
        Self::ZScore {
            feature: feature.into(),
            two_sided: false,
        }
    }

    pub fn logistic(terms: Vec<Term>) -> Self {
        Self::Logistic { terms, bias: 0.0 }
    }

    pub fn clipped_linear(terms: Vec<Term>, min: f64, max: f64) -> Self {
        Self::ClippedLinear {
            terms,
            bias: 0.0,
            min,
            max,
        }
    }

    /// Short name used in logs and reports.
    pub fn style(&self) -> &'static str {
        match self {
            Self::ZScore { .. } => "z_score",
            Self::Logistic { .. } => "logistic",
            Self::ClippedLinear { .. } => "clipped_linear",
        }
    }

    /// Interval every score produced by this calibration lies in.
    pub fn domain(&self) -> ScoreDomain {
        match self {
            Self::ZScore { two_sided: true, .. } => ScoreDomain {
                min: 0.0,
                max: f64::INFINITY,
            },
            Self::ZScore { .. } => ScoreDomain::UNBOUNDED,
            Self::Logistic { .. } => ScoreDomain::UNIT,
            Self::ClippedLinear { min, max, .. } => ScoreDomain {
                min: *min,
                max: *max,
            },
        }
    }

    /// Linear terms, empty for z-score.
    pub fn terms(&self) -> &[Term] {
        match self {
            Self::ZScore { .. } => &[],
            Self::Logistic { terms, .. } | Self::ClippedLinear { terms, .. } => terms,
        }
    }

    /// Shape checks that do not depend on the configured features.
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::ZScore { feature, .. } => {
                if feature.is_empty() {
                    return Err(ConfigError::InvalidCalibration(
                        "z_score: feature name is empty".into(),
                    ));
                }
            }
            Self::Logistic { terms, bias } => {
                check_linear("logistic", terms, *bias)?;
            }
            Self::ClippedLinear {
                terms,
                bias,
                min,
                max,
            } => {
                check_linear("clipped_linear", terms, *bias)?;
                if !(min.is_finite() && max.is_finite() && min < max) {
                    return Err(ConfigError::InvalidCalibration(format!(
                        "clipped_linear: bounds [{min}, {max}] must be finite with min < max"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_linear(context: &str, terms: &[Term], bias: f64) -> ConfigResult<()> {
    if terms.is_empty() {
        return Err(ConfigError::InvalidCalibration(format!(
            "{context}: at least one term is required"
        )));
    }
    if !bias.is_finite() {
        return Err(ConfigError::InvalidCalibration(format!(
            "{context}: bias {bias} is not finite"
        )));
    }
    terms.iter().try_for_each(|t| t.validate(context))
}

// ── Confidence ──────────────────────────────────────────────────────────

/// Heuristic confidence attached to a score: `1 − clip(Σ wᵢ·tᵢ, 0, max_penalty)`.
///
/// Auxiliary context only. It never changes the score or the segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceModel {
    pub terms: Vec<Term>,
    pub max_penalty: f64,
}

impl ConfidenceModel {
    pub fn new(terms: Vec<Term>, max_penalty: f64) -> Self {
        Self { terms, max_penalty }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.max_penalty) {
            return Err(ConfigError::InvalidCalibration(format!(
                "confidence: max_penalty {} must lie in [0, 1]",
                self.max_penalty
            )));
        }
        check_linear("confidence", &self.terms, 0.0)
    }

    /// Confidence from an already-weighted penalty sum.
    pub fn from_penalty(&self, penalty: f64) -> f64 {
        1.0 - penalty.clamp(0.0, self.max_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms() {
        assert_eq!(Transform::Identity.apply(-2.5), -2.5);
        assert_eq!(Transform::Hinge { knee: 0.65 }.apply(0.5), 0.0);
        assert!((Transform::Hinge { knee: 0.65 }.apply(0.75) - 0.1).abs() < 1e-12);
        assert_eq!(Transform::Log1pHinge { knee: 60.0 }.apply(20.0), 0.0);
        let above = Transform::Log1pHinge { knee: 60.0 }.apply(120.0);
        assert!((above - (121.0f64.ln() - 61.0f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn domains() {
        assert_eq!(Calibration::z_score("v").domain(), ScoreDomain::UNBOUNDED);
        let two = Calibration::ZScore {
            feature: "v".into(),
            two_sided: true,
        };
        assert_eq!(two.domain().min, 0.0);
        assert_eq!(
            Calibration::logistic(vec![Term::feature("a", 1.0)]).domain(),
            ScoreDomain::UNIT
        );
        let clipped = Calibration::clipped_linear(vec![Term::column("q", 1.0)], 0.0, 18.0);
        assert_eq!(clipped.domain(), ScoreDomain { min: 0.0, max: 18.0 });
        assert!(clipped.domain().contains(18.0));
        assert!(!clipped.domain().contains(18.5));
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        assert!(Calibration::logistic(vec![]).validate().is_err());
        assert!(Calibration::clipped_linear(vec![Term::column("q", 1.0)], 5.0, 5.0)
            .validate()
            .is_err());
        assert!(Calibration::logistic(vec![Term::feature("a", f64::NAN)])
            .validate()
            .is_err());
        assert!(Calibration::z_score("").validate().is_err());
        assert!(ConfidenceModel::new(vec![Term::column("r", 0.1)], 1.5)
            .validate()
            .is_err());
        assert!(ConfidenceModel::new(vec![Term::column("r", 0.1)], 0.7)
            .validate()
            .is_ok());
    }

    #[test]
    fn confidence_penalty_is_clipped() {
        let model = ConfidenceModel::new(vec![Term::column("r", 0.12)], 0.7);
        assert_eq!(model.from_penalty(-1.0), 1.0);
        assert!((model.from_penalty(0.25) - 0.75).abs() < 1e-12);
        assert!((model.from_penalty(3.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn serde_shape() {
        let json = r#"{
            "style": "logistic",
            "terms": [
                { "input": { "feature": "inc_rate" }, "weight": 2.2 },
                { "input": { "column": "cpu" }, "weight": 5.0,
                  "transform": { "kind": "hinge", "knee": 0.65 } }
            ]
        }"#;
        let cal: Calibration = serde_json::from_str(json).unwrap();
        assert_eq!(cal.style(), "logistic");
        assert_eq!(cal.terms().len(), 2);
        assert_eq!(cal.terms()[1].transform, Transform::Hinge { knee: 0.65 });
        assert!(cal.validate().is_ok());
    }
}
