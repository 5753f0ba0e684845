//! Daily per-account history with drifting incident risk.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use riskwatch_types::{Record, RecordSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SourceError, SourceResult};
use crate::sampling::{default_start, normal};
use crate::source::SeriesSource;

/// `entities × days` daily records.
///
/// Each entity has a base incident probability in `[0.05, 0.35)` and a small
/// linear drift. Columns:
///
/// - `activity`: daily volume, at least `5`
/// - `incidents`: `0` or `1`
/// - `behavior_index`: noisy signal correlated with incidents, in `[-2, 3]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityHistory {
    pub entities: usize,
    pub days: usize,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Default for EntityHistory {
    fn default() -> Self {
        Self {
            entities: 120,
            days: 90,
            start: default_start(),
            seed: 7,
        }
    }
}

impl EntityHistory {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn entity_name(index: usize) -> String {
        format!("ENT-{:03}", index + 1)
    }
}

impl SeriesSource for EntityHistory {
    fn name(&self) -> &str {
        "entity-history"
    }

    fn columns(&self) -> Vec<String> {
        vec![
            "activity".into(),
            "incidents".into(),
            "behavior_index".into(),
        ]
    }

    fn load(&self) -> SourceResult<RecordSet> {
        if self.entities == 0 || self.days == 0 {
            return Err(SourceError::invalid(
                "entities/days",
                "both must be at least 1",
            ));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let drift = normal(0.0, 0.002)?;
        let unit = normal(0.0, 1.0)?;
        let activity = normal(50.0, 15.0)?;
        let jitter = normal(0.0, 0.3)?;

        let base_risk: Vec<f64> = (0..self.entities)
            .map(|_| rng.gen_range(0.05..0.35))
            .collect();
        let span = (self.days.saturating_sub(1)).max(1) as f64;

        let mut records = RecordSet::default();
        for (e, base) in base_risk.iter().enumerate() {
            let name = Self::entity_name(e);
            let trend: f64 = drift.sample(&mut rng);
            for d in 0..self.days {
                // Drift ramps linearly from 0 on day one to trend·days on the last day.
                let p = base + trend * self.days as f64 * d as f64 / span;
                let incident = if rng.gen::<f64>() < p { 1.0 } else { 0.0 };
                let behavior = (0.4 * unit.sample(&mut rng)
                    + 0.6 * incident
                    + jitter.sample(&mut rng))
                .clamp(-2.0, 3.0);
                records.push(
                    Record::new(name.as_str(), self.start + Duration::days(d as i64))
                        .with_metric("activity", activity.sample(&mut rng).max(5.0))
                        .with_metric("incidents", incident)
                        .with_metric("behavior_index", behavior),
                );
            }
        }

        info!(
            source = self.name(),
            entities = self.entities,
            days = self.days,
            records = records.len(),
            seed = self.seed,
            "generated records"
        );
        Ok(records)
    }
}
