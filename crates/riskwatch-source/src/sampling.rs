//! Shared helpers for the seeded generators.

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use rand_distr::Normal;

use crate::error::{SourceError, SourceResult};

/// Midnight UTC on the given date, or the epoch for an invalid date.
pub(crate) fn midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub(crate) fn default_start() -> DateTime<Utc> {
    midnight(2025, 1, 1)
}

pub(crate) fn normal(mean: f64, std: f64) -> SourceResult<Normal<f64>> {
    Normal::new(mean, std).map_err(|e| SourceError::Distribution(format!("normal({mean}, {std}): {e}")))
}

/// Round half away from zero to `places` decimals.
pub(crate) fn round_to(x: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (x * scale).round() / scale
}

/// `count` distinct positions drawn uniformly from `lo..hi`, ascending.
pub(crate) fn distinct_positions<R: Rng>(
    rng: &mut R,
    lo: usize,
    hi: usize,
    count: usize,
) -> SourceResult<Vec<usize>> {
    let available = hi.saturating_sub(lo);
    if count > available {
        return Err(SourceError::invalid(
            "spikes",
            format!("{count} spikes requested but only {available} eligible positions"),
        ));
    }
    let mut picked: Vec<usize> = rand::seq::index::sample(rng, available, count)
        .into_iter()
        .map(|i| lo + i)
        .collect();
    picked.sort_unstable();
    Ok(picked)
}
