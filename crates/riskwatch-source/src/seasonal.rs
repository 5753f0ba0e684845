//! Single trending, seasonal series with injected spikes in both directions.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::Distribution;
use riskwatch_types::{Record, RecordSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SourceError, SourceResult};
use crate::sampling::{default_start, distinct_positions, normal};
use crate::source::SeriesSource;

const SPIKE_SIZES: [f64; 4] = [-8.0, -6.0, 6.0, 9.0];

/// `50 + 0.02·t + 2·sin(t/18) + noise`, sampled every `step_hours`.
///
/// `spikes` points at least 50 steps from either end are shifted by one of
/// `-8`, `-6`, `+6` or `+9`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalSpikes {
    pub entity: String,
    pub points: usize,
    pub spikes: usize,
    pub step_hours: i64,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Default for SeasonalSpikes {
    fn default() -> Self {
        Self {
            entity: "SERIES-01".into(),
            points: 400,
            spikes: 16,
            step_hours: 1,
            start: default_start(),
            seed: 42,
        }
    }
}

impl SeasonalSpikes {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl SeriesSource for SeasonalSpikes {
    fn name(&self) -> &str {
        "seasonal-spikes"
    }

    fn columns(&self) -> Vec<String> {
        vec!["value".into()]
    }

    fn load(&self) -> SourceResult<RecordSet> {
        if self.step_hours <= 0 {
            return Err(SourceError::invalid("step_hours", "must be positive"));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = normal(0.0, 0.8)?;

        let mut values: Vec<f64> = (0..self.points)
            .map(|t| {
                let t = t as f64;
                50.0 + 0.02 * t + (t / 18.0).sin() * 2.0 + noise.sample(&mut rng)
            })
            .collect();

        let margin = 50usize.min(self.points / 2);
        for i in distinct_positions(&mut rng, margin, self.points - margin, self.spikes)? {
            if let Some(size) = SPIKE_SIZES.choose(&mut rng) {
                values[i] += size;
            }
        }

        let records: RecordSet = values
            .into_iter()
            .enumerate()
            .map(|(t, value)| {
                Record::new(
                    self.entity.as_str(),
                    self.start + Duration::hours(t as i64 * self.step_hours),
                )
                .with_metric("value", value)
            })
            .collect();

        info!(
            source = self.name(),
            points = self.points,
            spikes = self.spikes,
            seed = self.seed,
            "generated records"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spikes_stand_out_from_baseline() {
        let source = SeasonalSpikes::default();
        let spiked = source.load().unwrap();
        let clean = SeasonalSpikes {
            spikes: 0,
            ..SeasonalSpikes::default()
        }
        .load()
        .unwrap();
        assert_eq!(spiked.len(), 400);

        // Same seed: the baseline draws match, only spiked points differ.
        let shifted: Vec<f64> = spiked
            .iter()
            .zip(clean.iter())
            .map(|(a, b)| a.metric("value").unwrap() - b.metric("value").unwrap())
            .filter(|d| d.abs() > 1e-9)
            .collect();
        assert_eq!(shifted.len(), 16);
        assert!(shifted
            .iter()
            .all(|d| SPIKE_SIZES.iter().any(|s| (s - d).abs() < 1e-9)));
    }

    #[test]
    fn single_entity_evenly_spaced() {
        let source = SeasonalSpikes {
            points: 120,
            spikes: 4,
            step_hours: 2,
            ..SeasonalSpikes::default()
        };
        let partitioned = source.load().unwrap().partition();
        assert_eq!(partitioned.series.len(), 1);
        let ts: Vec<_> = partitioned.series[0].records.iter().map(|r| r.timestamp).collect();
        assert!(ts.windows(2).all(|w| w[1] - w[0] == Duration::hours(2)));
    }
}
