//! Fixed-width trailing window with O(1) running statistics.
//!
//! Provides:
//! - **RollingWindow**: ring buffer of the `W` most recent values with running
//!   sum and sum-of-squares
//! - **WindowStats**: mean / population std / count of the current window
//! - **direct_stats**: two-pass recomputation over a slice, the reference the
//!   incremental path must agree with

use serde::{Deserialize, Serialize};

/// Summary statistics of the values currently in a window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f64,
    /// Population standard deviation (divides by `count`).
    pub std: f64,
    pub count: usize,
}

// ── Rolling Window ──────────────────────────────────────────────────────

/// A bounded circular buffer of the most recent values.
///
/// When full, the oldest value is evicted on push and its contribution is
/// subtracted from the running sums. Values are stored relative to the
/// first value ever pushed (`shift`), which keeps the sums small for
/// signals with a large offset.
///
/// The length of the trailing run of equal values is tracked alongside the
/// sums, so a window whose values are all equal reports `std == 0` exactly
/// regardless of rounding residue left by earlier evictions.
#[derive(Clone, Debug)]
pub struct RollingWindow {
    buffer: Vec<f64>,
    head: usize,
    len: usize,
    shift: Option<f64>,
    sum: f64,
    sum_sq: f64,
    pushes_since_resync: usize,
    last: f64,
    run_len: usize,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` values.
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            buffer: vec![0.0; cap],
            head: 0,
            len: 0,
            shift: None,
            sum: 0.0,
            sum_sq: 0.0,
            pushes_since_resync: 0,
            last: 0.0,
            run_len: 0,
        }
    }

    /// Push a value, evicting the oldest if full.
    pub fn push(&mut self, value: f64) {
        let shift = *self.shift.get_or_insert(value);
        let x = value - shift;

        if self.run_len > 0 && value == self.last {
            self.run_len += 1;
        } else {
            self.run_len = 1;
        }
        self.last = value;

        if self.len == self.buffer.len() {
            let old = self.buffer[self.head];
            self.sum -= old;
            self.sum_sq -= old * old;
        } else {
            self.len += 1;
        }
        self.buffer[self.head] = x;
        self.head = (self.head + 1) % self.buffer.len();
        self.sum += x;
        self.sum_sq += x * x;

        // Rebuild the sums from the buffer once per full rotation so eviction
        // residue never accumulates past one window's worth of updates.
        self.pushes_since_resync += 1;
        if self.pushes_since_resync >= self.buffer.len() {
            self.resync();
        }
    }

    fn resync(&mut self) {
        let (sum, sum_sq) = self
            .shifted()
            .fold((0.0, 0.0), |(s, sq), x| (s + x, sq + x * x));
        self.sum = sum;
        self.sum_sq = sum_sq;
        self.pushes_since_resync = 0;
    }

    /// Shifted values in insertion order (oldest first).
    fn shifted(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.buffer.len();
        let start = if self.len < cap { 0 } else { self.head };
        (0..self.len).map(move |i| self.buffer[(start + i) % cap])
    }

    /// Values in insertion order (oldest first).
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let shift = self.shift.unwrap_or(0.0);
        self.shifted().map(move |x| x + shift)
    }

    /// Number of values currently in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }

    /// Whether every value in the window is equal.
    pub fn is_flat(&self) -> bool {
        self.len > 0 && self.run_len >= self.len
    }

    /// Statistics of the current window, `None` when empty.
    pub fn stats(&self) -> Option<WindowStats> {
        if self.len == 0 {
            return None;
        }
        if self.is_flat() {
            return Some(WindowStats {
                mean: self.last,
                std: 0.0,
                count: self.len,
            });
        }
        let n = self.len as f64;
        let shifted_mean = self.sum / n;
        let variance = (self.sum_sq / n - shifted_mean * shifted_mean).max(0.0);
        Some(WindowStats {
            mean: self.shift.unwrap_or(0.0) + shifted_mean,
            std: variance.sqrt(),
            count: self.len,
        })
    }
}

// ── Direct Recomputation ────────────────────────────────────────────────

/// Two-pass mean / population std over a slice, `None` when empty.
///
/// Values are taken relative to the first one, and a slice of equal values
/// reports that value and `std == 0` exactly, as [`RollingWindow`] does.
pub fn direct_stats(values: &[f64]) -> Option<WindowStats> {
    let first = *values.first()?;
    if values.iter().all(|v| *v == first) {
        return Some(WindowStats {
            mean: first,
            std: 0.0,
            count: values.len(),
        });
    }
    let n = values.len() as f64;
    let shifted_mean = values.iter().map(|v| v - first).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let d = v - first - shifted_mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Some(WindowStats {
        mean: first + shifted_mean,
        std: variance.sqrt(),
        count: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_stats() {
        let w = RollingWindow::new(4);
        assert!(w.is_empty());
        assert!(w.stats().is_none());
        assert!(direct_stats(&[]).is_none());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut w = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            w.push(v);
        }
        assert!(w.is_full());
        assert_eq!(w.values().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        let s = w.stats().unwrap();
        assert_eq!(s.count, 3);
        assert!((s.mean - 4.0).abs() < 1e-12);
        assert!((s.std - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn constant_signal_is_exactly_flat() {
        let mut w = RollingWindow::new(10);
        for _ in 0..50 {
            w.push(0.1);
            let s = w.stats().unwrap();
            assert_eq!(s.std, 0.0);
            assert_eq!(s.mean, 0.1);
        }
    }

    #[test]
    fn flat_again_after_spike_leaves_window() {
        let mut w = RollingWindow::new(4);
        for v in [3.3, 3.3, 9.7, 3.3, 3.3, 3.3, 3.3, 3.3] {
            w.push(v);
        }
        assert!(w.is_flat());
        assert_eq!(w.stats().unwrap().std, 0.0);
        assert_eq!(w.stats().unwrap().mean, 3.3);
    }

    #[test]
    fn spike_statistics_are_exact() {
        // Nine tens and a twenty: mean 11, population variance 9.
        let mut w = RollingWindow::new(10);
        for _ in 0..26 {
            w.push(10.0);
        }
        w.push(20.0);
        let s = w.stats().unwrap();
        assert_eq!(s.mean, 11.0);
        assert_eq!(s.std, 3.0);
    }

    #[test]
    fn single_value_window_has_zero_std() {
        let mut w = RollingWindow::new(5);
        w.push(42.0);
        let s = w.stats().unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, 42.0);
        assert_eq!(s.std, 0.0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut w = RollingWindow::new(0);
        assert_eq!(w.capacity(), 1);
        w.push(1.0);
        w.push(2.0);
        assert_eq!(w.values().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn direct_constant_slice_is_exactly_flat() {
        let s = direct_stats(&[0.1; 3]).unwrap();
        assert_eq!(s.mean, 0.1);
        assert_eq!(s.std, 0.0);

        let mut w = RollingWindow::new(3);
        for _ in 0..3 {
            w.push(0.1);
        }
        assert_eq!(w.stats(), Some(s));
    }

    #[test]
    fn stats_serialize_as_plain_fields() {
        let s = direct_stats(&[1.0, 3.0]).unwrap();
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json, serde_json::json!({"mean": 2.0, "std": 1.0, "count": 2}));
        let back: WindowStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn matches_direct_on_sliding_sequence() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 11) as f64 * 0.7 - 2.0).collect();
        let mut w = RollingWindow::new(7);
        for (i, v) in values.iter().enumerate() {
            w.push(*v);
            let start = (i + 1).saturating_sub(7);
            let direct = direct_stats(&values[start..=i]).unwrap();
            let inc = w.stats().unwrap();
            assert_eq!(inc.count, direct.count);
            assert!((inc.mean - direct.mean).abs() < 1e-9);
            assert!((inc.std - direct.std).abs() < 1e-9);
        }
    }
}
