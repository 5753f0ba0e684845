//! Hourly asset telemetry with injected spikes.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use riskwatch_types::{Record, RecordSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SourceError, SourceResult};
use crate::sampling::{default_start, distinct_positions, normal};
use crate::source::SeriesSource;

/// Per-asset hourly signal: slow random walk around `10.0` plus noise, with
/// `spikes_per_asset` upward spikes of roughly `+6` at random hours.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticEvents {
    pub assets: Vec<String>,
    pub hours: usize,
    pub spikes_per_asset: usize,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Default for SyntheticEvents {
    fn default() -> Self {
        Self {
            assets: vec!["TRUCK-01".into(), "TRUCK-02".into(), "TRUCK-03".into()],
            hours: 720,
            spikes_per_asset: 4,
            start: default_start(),
            seed: 42,
        }
    }
}

impl SyntheticEvents {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl SeriesSource for SyntheticEvents {
    fn name(&self) -> &str {
        "synthetic-events"
    }

    fn columns(&self) -> Vec<String> {
        vec!["value".into()]
    }

    fn load(&self) -> SourceResult<RecordSet> {
        if self.assets.is_empty() {
            return Err(SourceError::invalid("assets", "at least one asset is required"));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let step = normal(0.0, 1.0)?;
        let noise = normal(0.0, 0.5)?;
        let spike = normal(6.0, 2.0)?;

        // Keep spikes away from both ends so the window is warm around them.
        let margin = (self.hours / 4).min(200);
        let mut records = RecordSet::default();
        for asset in &self.assets {
            let mut walk = 0.0;
            let mut values: Vec<f64> = (0..self.hours)
                .map(|_| {
                    walk += step.sample(&mut rng);
                    10.0 + 0.02 * walk + noise.sample(&mut rng)
                })
                .collect();
            for i in distinct_positions(&mut rng, margin, self.hours - margin, self.spikes_per_asset)? {
                values[i] += spike.sample(&mut rng);
            }
            for (h, value) in values.into_iter().enumerate() {
                records.push(
                    Record::new(asset.as_str(), self.start + Duration::hours(h as i64))
                        .with_metric("value", value),
                );
            }
        }

        info!(
            source = self.name(),
            assets = self.assets.len(),
            records = records.len(),
            seed = self.seed,
            "generated records"
        );
        Ok(records)
    }
}
