//! Segment threshold tables.

use std::collections::HashSet;

use riskwatch_types::{ConfigError, ConfigResult, Segment};
use serde::{Deserialize, Serialize};

/// Upper limit on bands per table.
pub const MAX_SEGMENTS: usize = 16;

/// One interval of the score axis and its label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub fn new(label: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            label: label.into(),
            lower,
            upper,
        }
    }
}

/// Validated, ordered list of contiguous bands, least severe first.
///
/// Construction rejects empty tables, duplicate labels, NaN bounds, empty
/// intervals and gaps or overlaps between neighbours, so a built table always
/// partitions `[min, max]` exhaustively and disjointly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct SegmentTable {
    bands: Vec<Band>,
}

impl SegmentTable {
    pub fn new(bands: Vec<Band>) -> ConfigResult<Self> {
        if bands.is_empty() {
            return Err(ConfigError::EmptySegmentTable);
        }
        if bands.len() > MAX_SEGMENTS {
            return Err(ConfigError::TooManySegments(bands.len()));
        }

        let mut labels = HashSet::new();
        for band in &bands {
            if band.lower.is_nan() || band.upper.is_nan() {
                return Err(ConfigError::NanBound {
                    label: band.label.clone(),
                });
            }
            if band.lower >= band.upper {
                return Err(ConfigError::EmptyBand {
                    label: band.label.clone(),
                    lower: band.lower,
                    upper: band.upper,
                });
            }
            if band.label.is_empty() || !labels.insert(band.label.as_str()) {
                return Err(ConfigError::DuplicateSegment(band.label.clone()));
            }
        }

        for pair in bands.windows(2) {
            let (below, above) = (&pair[0], &pair[1]);
            if below.upper != above.lower {
                return Err(ConfigError::SegmentsNotContiguous {
                    below: below.label.clone(),
                    above: above.label.clone(),
                    upper: below.upper,
                    lower: above.lower,
                });
            }
        }

        Ok(Self { bands })
    }

    /// Build from labels and the interior cut points between them.
    ///
    /// `labels.len()` must be `cuts.len() + 1`.
    pub fn from_cuts<S: AsRef<str>>(
        labels: &[S],
        cuts: &[f64],
        min: f64,
        max: f64,
    ) -> ConfigResult<Self> {
        if labels.len() != cuts.len() + 1 {
            return Err(ConfigError::InvalidParameter {
                name: "cuts".into(),
                detail: format!(
                    "{} labels need {} cut points, got {}",
                    labels.len(),
                    labels.len().saturating_sub(1),
                    cuts.len()
                ),
            });
        }
        let edges: Vec<f64> = std::iter::once(min)
            .chain(cuts.iter().copied())
            .chain(std::iter::once(max))
            .collect();
        let bands = labels
            .iter()
            .zip(edges.windows(2))
            .map(|(label, e)| Band::new(label.as_ref(), e[0], e[1]))
            .collect();
        Self::new(bands)
    }

    /// `LOW < MEDIUM < HIGH` over the whole real line; `warn` and `alert`
    /// are the lower bounds of MEDIUM and HIGH.
    pub fn anomaly(warn: f64, alert: f64) -> ConfigResult<Self> {
        Self::from_cuts(
            &["LOW", "MEDIUM", "HIGH"],
            &[warn, alert],
            f64::NEG_INFINITY,
            f64::INFINITY,
        )
    }

    /// `LOW < MEDIUM < HIGH` over `[0, 1]`.
    pub fn risk(medium: f64, high: f64) -> ConfigResult<Self> {
        Self::from_cuts(&["LOW", "MEDIUM", "HIGH"], &[medium, high], 0.0, 1.0)
    }

    /// `ON_TIME < MINOR < MODERATE < SEVERE` over `[0, max]`.
    pub fn delay(cuts: [f64; 3], max: f64) -> ConfigResult<Self> {
        Self::from_cuts(&["ON_TIME", "MINOR", "MODERATE", "SEVERE"], &cuts, 0.0, max)
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Lowest bound of the table.
    pub fn min(&self) -> f64 {
        self.bands.first().map_or(f64::NEG_INFINITY, |b| b.lower)
    }

    /// Highest bound of the table (inclusive).
    pub fn max(&self) -> f64 {
        self.bands.last().map_or(f64::INFINITY, |b| b.upper)
    }

    /// Segment for a score.
    ///
    /// Lower bounds are inclusive. Scores outside `[min, max]` fall into the
    /// nearest edge band (NaN into the lowest), so the mapping is total and
    /// monotonic.
    pub fn classify(&self, value: f64) -> Segment {
        let index = self
            .bands
            .partition_point(|b| b.lower <= value)
            .saturating_sub(1);
        self.segment_at(index)
    }

    fn segment_at(&self, level: usize) -> Segment {
        Segment::new(level, self.bands[level].label.clone())
    }

    /// All segments in severity order.
    pub fn segments(&self) -> Vec<Segment> {
        (0..self.bands.len()).map(|i| self.segment_at(i)).collect()
    }

    /// Segment by label.
    pub fn segment(&self, label: &str) -> ConfigResult<Segment> {
        self.bands
            .iter()
            .position(|b| b.label == label)
            .map(|i| self.segment_at(i))
            .ok_or_else(|| ConfigError::UnknownSegment(label.to_string()))
    }

    pub fn lowest(&self) -> Segment {
        self.segment_at(0)
    }

    pub fn highest(&self) -> Segment {
        self.segment_at(self.bands.len() - 1)
    }

    /// Whether `[domain_min, domain_max]` lies within the table.
    pub fn covers(&self, domain_min: f64, domain_max: f64) -> bool {
        self.min() <= domain_min && self.max() >= domain_max
    }

    pub fn check_covers(&self, domain_min: f64, domain_max: f64) -> ConfigResult<()> {
        if self.covers(domain_min, domain_max) {
            Ok(())
        } else {
            Err(ConfigError::DomainNotCovered {
                domain_min,
                domain_max,
                table_min: self.min(),
                table_max: self.max(),
            })
        }
    }
}

impl TryFrom<Vec<Band>> for SegmentTable {
    type Error = ConfigError;

    fn try_from(bands: Vec<Band>) -> ConfigResult<Self> {
        Self::new(bands)
    }
}

impl From<SegmentTable> for Vec<Band> {
    fn from(table: SegmentTable) -> Self {
        table.bands
    }
}
