//! Running statistics for a generation loop.
//!
//! [`AverageMeter`] tracks the latest value and running mean of one quantity;
//! [`RecorderMeter`] keeps a full per-generation series for a fixed set of
//! named metrics.

use core::fmt;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Latest value, running sum and running mean of a weighted stream.
///
/// # Examples
///
/// ```
/// use diffevo::meters::AverageMeter;
///
/// let mut meter = AverageMeter::new();
/// meter.update(1.0, 1);
/// meter.update(4.0, 2);
/// assert!((meter.avg() - 3.0).abs() < 1e-12);
/// assert!((meter.val() - 4.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AverageMeter {
    val: f64,
    avg: f64,
    sum: f64,
    count: u64,
}

impl AverageMeter {
    /// Creates an empty meter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all accumulated state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records `val` with weight `n`. A zero weight only updates [`val`](Self::val).
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, val: f64, n: u64) {
        self.val = val;
        self.sum += val * n as f64;
        self.count += n;
        if self.count > 0 {
            self.avg = self.sum / self.count as f64;
        }
    }

    /// Returns the most recent value.
    #[must_use]
    pub fn val(&self) -> f64 {
        self.val
    }

    /// Returns the weighted running mean.
    #[must_use]
    pub fn avg(&self) -> f64 {
        self.avg
    }

    /// Returns the weighted running sum.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the total weight recorded.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl fmt::Display for AverageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AverageMeter(val={}, avg={}, count={})",
            self.val, self.avg, self.count
        )
    }
}

/// Per-generation history of a fixed set of named metrics.
///
/// Updates for labels that were not declared up front are ignored.
///
/// # Examples
///
/// ```
/// use diffevo::meters::RecorderMeter;
///
/// let mut recorder = RecorderMeter::new(["best", "mean"]);
/// recorder.update([("best", 0.4), ("mean", 0.1)]);
/// recorder.update([("best", 0.9), ("other", 7.0)]);
///
/// assert_eq!(recorder.series("best"), Some(&[0.4, 0.9][..]));
/// assert_eq!(recorder.max_metric("best"), Some(0.9));
/// assert!(recorder.series("other").is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecorderMeter {
    labels: Vec<String>,
    metrics: HashMap<String, Vec<f64>>,
}

impl RecorderMeter {
    /// Creates a recorder for the given metric labels.
    #[must_use]
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let metrics = labels.iter().map(|l| (l.clone(), Vec::new())).collect();
        Self { labels, metrics }
    }

    /// Clears every series while keeping the labels.
    pub fn reset(&mut self) {
        for series in self.metrics.values_mut() {
            series.clear();
        }
    }

    /// Appends one value per known label; unknown labels are skipped.
    pub fn update<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        for (label, value) in values {
            if let Some(series) = self.metrics.get_mut(label.as_ref()) {
                series.push(value);
            }
        }
    }

    /// Returns the declared labels in declaration order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the recorded series for `label`.
    #[must_use]
    pub fn series(&self, label: &str) -> Option<&[f64]> {
        self.metrics.get(label).map(Vec::as_slice)
    }

    /// Returns the most recent value recorded for `label`.
    #[must_use]
    pub fn last(&self, label: &str) -> Option<f64> {
        self.series(label).and_then(|s| s.last().copied())
    }

    /// Returns the largest value recorded for `label`, or `None` if the
    /// label is unknown or its series is empty.
    #[must_use]
    pub fn max_metric(&self, label: &str) -> Option<f64> {
        self.series(label)?.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_meter_weighted_mean() {
        let mut meter = AverageMeter::new();
        meter.update(2.0, 3);
        meter.update(6.0, 1);
        assert!((meter.sum() - 12.0).abs() < 1e-12);
        assert_eq!(meter.count(), 4);
        assert!((meter.avg() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_meter_zero_weight_keeps_avg() {
        let mut meter = AverageMeter::new();
        meter.update(5.0, 0);
        assert!((meter.val() - 5.0).abs() < f64::EPSILON);
        assert!(meter.avg().abs() < f64::EPSILON);
        assert_eq!(meter.count(), 0);
    }

    #[test]
    fn test_average_meter_reset() {
        let mut meter = AverageMeter::new();
        meter.update(1.0, 1);
        meter.reset();
        assert_eq!(meter, AverageMeter::default());
    }

    #[test]
    fn test_average_meter_display() {
        let mut meter = AverageMeter::new();
        meter.update(0.5, 2);
        assert_eq!(meter.to_string(), "AverageMeter(val=0.5, avg=0.5, count=2)");
    }

    #[test]
    fn test_recorder_ignores_unknown_labels() {
        let mut recorder = RecorderMeter::new(["a"]);
        recorder.update([("b", 1.0)]);
        assert_eq!(recorder.series("a"), Some(&[][..]));
        assert!(recorder.series("b").is_none());
    }

    #[test]
    fn test_recorder_max_and_last() {
        let mut recorder = RecorderMeter::new(vec![String::from("fitness")]);
        for v in [0.3, 0.8, 0.5] {
            recorder.update([("fitness", v)]);
        }
        assert_eq!(recorder.max_metric("fitness"), Some(0.8));
        assert_eq!(recorder.last("fitness"), Some(0.5));
        assert_eq!(recorder.max_metric("missing"), None);
    }

    #[test]
    fn test_recorder_reset_keeps_labels() {
        let mut recorder = RecorderMeter::new(["x", "y"]);
        recorder.update([("x", 1.0), ("y", 2.0)]);
        recorder.reset();
        assert_eq!(recorder.labels(), &["x".to_owned(), "y".to_owned()]);
        assert_eq!(recorder.max_metric("x"), None);
    }
}
