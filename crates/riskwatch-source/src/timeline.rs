//! Batch jobs with planned durations and execution signals.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, LogNormal, Poisson};
use riskwatch_types::{Record, RecordSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SourceError, SourceResult};
use crate::sampling::{midnight, normal, round_to};
use crate::source::SeriesSource;

/// One record per job, timestamped at its start.
///
/// The actual duration grows with queue wait, retries, CPU pressure above
/// 65 % and data volume above 60 GB, plus noise; `delay_h` is actual minus
/// planned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTimeline {
    pub jobs: usize,
    /// Jobs start on a random day in `[start, start + horizon_days)`.
    pub horizon_days: u32,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Default for JobTimeline {
    fn default() -> Self {
        Self {
            jobs: 220,
            horizon_days: 60,
            start: midnight(2025, 10, 1),
            seed: 6,
        }
    }
}

impl JobTimeline {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

fn distribution_error(what: &str, e: impl std::fmt::Display) -> SourceError {
    SourceError::Distribution(format!("{what}: {e}"))
}

impl SeriesSource for JobTimeline {
    fn name(&self) -> &str {
        "job-timeline"
    }

    fn columns(&self) -> Vec<String> {
        [
            "planned_duration_h",
            "queue_wait_h",
            "retries",
            "cpu_pressure",
            "data_gb",
            "actual_duration_h",
            "delay_h",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn load(&self) -> SourceResult<RecordSet> {
        if self.horizon_days == 0 {
            return Err(SourceError::invalid("horizon_days", "must be at least 1"));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let planned = normal(6.0, 2.2)?;
        let queue = Gamma::<f64>::new(2.0, 0.6).map_err(|e| distribution_error("gamma(2, 0.6)", e))?;
        let retries = Poisson::<f64>::new(0.4).map_err(|e| distribution_error("poisson(0.4)", e))?;
        let cpu = normal(0.55, 0.18)?;
        let data =
            LogNormal::<f64>::new(2.0, 0.55).map_err(|e| distribution_error("lognormal(2, 0.55)", e))?;
        let noise = normal(0.0, 0.8)?;

        let mut records = RecordSet::default();
        for j in 0..self.jobs {
            let day = rng.gen_range(0..self.horizon_days);
            let planned_h = round_to(planned.sample(&mut rng).clamp(1.0, 18.0), 2);
            let queue_h = round_to(queue.sample(&mut rng).clamp(0.0, 6.0), 2);
            let retries_n: f64 = retries.sample(&mut rng);
            let cpu_p = round_to(cpu.sample(&mut rng).clamp(0.05, 0.98), 3);
            let data_gb = round_to(data.sample(&mut rng).clamp(1.0, 400.0), 1);

            let actual = (planned_h
                + 0.7 * queue_h
                + 0.9 * retries_n
                + 3.2 * (cpu_p - 0.65).max(0.0)
                + 0.006 * (data_gb - 60.0).max(0.0)
                + noise.sample(&mut rng))
            .clamp(0.7, 40.0);
            let actual_h = round_to(actual, 2);

            records.push(
                Record::new(
                    format!("JOB-{:04}", j + 1),
                    self.start + Duration::days(i64::from(day)),
                )
                .with_metric("planned_duration_h", planned_h)
                .with_metric("queue_wait_h", queue_h)
                .with_metric("retries", retries_n)
                .with_metric("cpu_pressure", cpu_p)
                .with_metric("data_gb", data_gb)
                .with_metric("actual_duration_h", actual_h)
                .with_metric("delay_h", round_to(actual_h - planned_h, 2)),
            );
        }

        info!(
            source = self.name(),
            jobs = self.jobs,
            seed = self.seed,
            "generated records"
        );
        Ok(records)
    }
}
