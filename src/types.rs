//! Shared types: confidence estimates, group identity, and axis scales.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current belief about one group's true aggregate value.
///
/// The external query engine refreshes these as sampling progresses: the
/// interval `[low, high]` shrinks toward `center`, and `stdev` (derived by
/// the sampler from the same uncertainty model) shrinks toward zero. A
/// degenerate estimate (`stdev == 0`, zero-width interval) means sampling
/// for that group is complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEstimate {
    /// Point estimate of the true aggregate value.
    pub center: f64,
    /// Lower interval bound.
    pub low: f64,
    /// Upper interval bound.
    pub high: f64,
    /// Standard deviation of the uncertainty model behind the interval.
    pub stdev: f64,
}

impl ConfidenceEstimate {
    /// Create an estimate from explicit sampler output.
    ///
    /// # Panics
    ///
    /// Panics unless `low <= center <= high`, `stdev >= 0`, and all values
    /// are finite.
    pub fn new(center: f64, low: f64, high: f64, stdev: f64) -> Self {
        assert!(
            center.is_finite() && low.is_finite() && high.is_finite() && stdev.is_finite(),
            "confidence estimate must be finite"
        );
        assert!(
            low <= center && center <= high,
            "confidence interval must satisfy low <= center <= high"
        );
        assert!(stdev >= 0.0, "stdev must be non-negative");

        Self {
            center,
            low,
            high,
            stdev,
        }
    }

    /// Create a 3-sigma estimate: `low = center - 3*stdev`, `high = center + 3*stdev`.
    ///
    /// This is the interval convention the visualization layer draws.
    pub fn ci3(center: f64, stdev: f64) -> Self {
        Self::new(center, center - 3.0 * stdev, center + 3.0 * stdev, stdev)
    }

    /// Create a degenerate estimate for a group whose sampling is complete.
    pub fn exact(value: f64) -> Self {
        Self::new(value, value, value, 0.0)
    }

    /// Width of the confidence interval.
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Whether the uncertainty has collapsed (`stdev == 0`).
    pub fn is_degenerate(&self) -> bool {
        self.stdev == 0.0
    }

    /// Whether `value` lies inside the closed interval `[low, high]`.
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// One component of a group key: the grouped value on one grouping axis.
///
/// The query engine's groupers map raw values to stable identifiers; the
/// engine only needs identity and, for binned axes, the bin index that the
/// snapshot's [`AxisScale`] turns back into numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyPart {
    /// A categorical value, e.g. a country name.
    Category(String),
    /// A numeric bin, identified by its index on a binned axis.
    Bin(i64),
    /// Rows whose grouping value was missing.
    Null,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Category(name) => f.write_str(name),
            KeyPart::Bin(index) => write!(f, "bin {index}"),
            KeyPart::Null => f.write_str("(empty)"),
        }
    }
}

/// Identity of one group in a query's group-by domain.
///
/// One part for 1-D results (bars, histogram bins), two parts for 2-D
/// results (heatmap cells).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    parts: Vec<KeyPart>,
}

impl GroupKey {
    /// Key on a single grouping axis.
    pub fn single(part: KeyPart) -> Self {
        Self { parts: vec![part] }
    }

    /// Key on two grouping axes (a 2-D cell).
    pub fn pair(first: KeyPart, second: KeyPart) -> Self {
        Self {
            parts: vec![first, second],
        }
    }

    /// Build from raw parts.
    ///
    /// # Panics
    ///
    /// Panics unless there are one or two parts.
    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        assert!(
            (1..=2).contains(&parts.len()),
            "group keys carry one or two parts"
        );
        Self { parts }
    }

    /// The key's parts, one per grouping axis.
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        Self::single(KeyPart::Category(name.to_owned()))
    }
}

/// How one grouping axis maps bin indices back to numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AxisScale {
    /// Unordered categories; no numeric positions.
    Categorical,
    /// Uniform bins: bin `i` covers `[base + step*i, base + step*(i+1))`.
    Binned {
        /// Left edge of bin 0.
        base: f64,
        /// Bin width.
        step: f64,
    },
}

impl AxisScale {
    /// Create a binned scale.
    ///
    /// # Panics
    ///
    /// Panics unless `step > 0` and both values are finite.
    pub fn binned(base: f64, step: f64) -> Self {
        assert!(base.is_finite() && step.is_finite(), "scale must be finite");
        assert!(step > 0.0, "bin step must be positive");
        AxisScale::Binned { base, step }
    }

    /// Whether the axis carries numeric bins.
    pub fn is_binned(&self) -> bool {
        matches!(self, AxisScale::Binned { .. })
    }

    /// Numeric bounds of bin `index`, if the axis is binned.
    pub fn bin_bounds(&self, index: i64) -> Option<(f64, f64)> {
        match *self {
            AxisScale::Categorical => None,
            AxisScale::Binned { base, step } => {
                let lo = base + step * index as f64;
                Some((lo, lo + step))
            }
        }
    }

    /// Numeric midpoint of bin `index`, if the axis is binned.
    pub fn bin_midpoint(&self, index: i64) -> Option<f64> {
        self.bin_bounds(index).map(|(lo, hi)| (lo + hi) / 2.0)
    }
}

/// One row of the materialized result: a group and its current estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// The group's identity.
    pub key: GroupKey,
    /// Current belief about the group's aggregate value.
    pub estimate: ConfidenceEstimate,
}

impl ResultRow {
    /// Pair a key with its estimate.
    pub fn new(key: GroupKey, estimate: ConfidenceEstimate) -> Self {
        Self { key, estimate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ci3_spans_three_sigma() {
        let est = ConfidenceEstimate::ci3(10.0, 2.0);
        assert_eq!(est.low, 4.0);
        assert_eq!(est.high, 16.0);
        assert_eq!(est.width(), 12.0);
        assert!(!est.is_degenerate());
    }

    #[test]
    fn exact_estimate_is_degenerate() {
        let est = ConfidenceEstimate::exact(7.5);
        assert!(est.is_degenerate());
        assert_eq!(est.width(), 0.0);
        assert!(est.contains(7.5));
        assert!(!est.contains(7.6));
    }

    #[test]
    fn contains_is_inclusive() {
        let est = ConfidenceEstimate::new(10.0, 5.0, 15.0, 2.0);
        assert!(est.contains(5.0));
        assert!(est.contains(15.0));
        assert!(!est.contains(4.999));
    }

    #[test]
    #[should_panic(expected = "low <= center <= high")]
    fn inverted_interval_panics() {
        ConfidenceEstimate::new(10.0, 12.0, 8.0, 1.0);
    }

    #[test]
    #[should_panic(expected = "stdev must be non-negative")]
    fn negative_stdev_panics() {
        ConfidenceEstimate::new(10.0, 8.0, 12.0, -1.0);
    }

    #[test]
    fn key_display_joins_parts() {
        let key = GroupKey::pair(KeyPart::Category("Asia".into()), KeyPart::Bin(3));
        assert_eq!(key.to_string(), "Asia, bin 3");
        assert_eq!(GroupKey::single(KeyPart::Null).to_string(), "(empty)");
    }

    #[test]
    fn keys_hash_by_identity() {
        use std::collections::HashSet;

        let mut keys = HashSet::new();
        keys.insert(GroupKey::from("A"));
        keys.insert(GroupKey::from("A"));
        keys.insert(GroupKey::from("B"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn binned_scale_recovers_bounds() {
        let scale = AxisScale::binned(0.0, 10.0);
        assert_eq!(scale.bin_bounds(0), Some((0.0, 10.0)));
        assert_eq!(scale.bin_bounds(3), Some((30.0, 40.0)));
        assert_eq!(scale.bin_midpoint(3), Some(35.0));
        assert_eq!(AxisScale::Categorical.bin_midpoint(3), None);
    }

    #[test]
    #[should_panic(expected = "bin step must be positive")]
    fn zero_step_panics() {
        AxisScale::binned(0.0, 0.0);
    }
}
