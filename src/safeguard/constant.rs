//! Hypothesis targets: the values and models safeguards test against.
//!
//! Threshold constants (`Value`, `Rank`, `Range`) are captured once when the
//! user pins a hypothesis and never change afterward. Model constants
//! (`PowerLaw`, `Normal`, `Linear`) are fitted from a result snapshot and
//! refitted on demand as more data arrives.

use serde::{Deserialize, Serialize};

use crate::error::SafeguardError;
use crate::statistics::{fit_line, fit_line_weighted, normal_cdf, weighted_moments};
use crate::types::ConfidenceEstimate;

/// A fixed value threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueConstant {
    /// The threshold.
    pub value: f64,
}

impl ValueConstant {
    /// Create a value threshold.
    ///
    /// # Panics
    ///
    /// Panics when `value` is not finite.
    pub fn new(value: f64) -> Self {
        assert!(value.is_finite(), "value threshold must be finite");
        Self { value }
    }
}

/// A fixed rank threshold in the value-descending ordering (rank 1 is the
/// largest group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankConstant {
    /// The 1-based rank.
    pub rank: usize,
}

impl RankConstant {
    /// Create a rank threshold.
    ///
    /// # Panics
    ///
    /// Panics when `rank` is zero.
    pub fn new(rank: usize) -> Self {
        assert!(rank >= 1, "ranks are 1-based");
        Self { rank }
    }
}

/// A fixed interval with a representative center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeConstant {
    /// Representative point, usually the estimate center at pin time.
    pub center: f64,
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl RangeConstant {
    /// Create an interval with an explicit center.
    ///
    /// # Panics
    ///
    /// Panics unless `low <= center <= high` and all values are finite.
    pub fn new(center: f64, low: f64, high: f64) -> Self {
        assert!(
            center.is_finite() && low.is_finite() && high.is_finite(),
            "range must be finite"
        );
        assert!(
            low <= center && center <= high,
            "range must satisfy low <= center <= high"
        );
        Self { center, low, high }
    }

    /// Create an interval centered on its midpoint, e.g. from a brush.
    pub fn span(low: f64, high: f64) -> Self {
        Self::new((low + high) / 2.0, low, high)
    }

    /// Capture a group's current interval as the target.
    ///
    /// For aggregates that are non-negative by construction, a lower bound
    /// below zero is an artifact of the symmetric interval model. The
    /// interval is trimmed symmetrically back to zero: `[0, high + low]`,
    /// which keeps the center in the middle for the usual centered
    /// estimates.
    pub fn from_estimate(estimate: &ConfidenceEstimate, always_non_negative: bool) -> Self {
        let mut low = estimate.low;
        let mut high = estimate.high;
        if always_non_negative && low < 0.0 {
            high = (high + low).max(estimate.center);
            low = 0.0;
        }
        Self::new(estimate.center, low, high)
    }

    /// Whether `value` lies inside the closed interval.
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// A fitted power law `y = amplitude * rank^exponent` over the
/// value-descending ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawConstant {
    /// Scale factor `a`.
    pub amplitude: f64,
    /// Exponent `b`, negative for decaying rank-size data.
    pub exponent: f64,
}

impl PowerLawConstant {
    /// Fit by ordinary least squares in log-log space.
    ///
    /// `series` must hold positive values in descending order; the 1-based
    /// position in the slice is the rank.
    pub fn fit(series: &[f64]) -> Result<Self, SafeguardError> {
        if series.len() < 2 {
            return Err(SafeguardError::InsufficientData {
                needed: 2,
                actual: series.len(),
            });
        }
        debug_assert!(series.iter().all(|&v| v > 0.0), "series must be positive");

        let points: Vec<(f64, f64)> = series
            .iter()
            .enumerate()
            .map(|(i, &value)| (((i + 1) as f64).ln(), value.ln()))
            .collect();

        let line = fit_line(&points).ok_or(SafeguardError::InsufficientData {
            needed: 2,
            actual: series.len(),
        })?;

        Ok(Self {
            amplitude: line.intercept.exp(),
            exponent: line.slope,
        })
    }

    /// Model value at the given 1-based rank.
    pub fn predict(&self, rank: f64) -> f64 {
        self.amplitude * rank.powf(self.exponent)
    }
}

/// A fitted normal distribution over a binned axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalConstant {
    /// Location.
    pub mean: f64,
    /// Scale.
    pub stdev: f64,
}

impl NormalConstant {
    /// Fit mean and stdev by weighted moments over `(midpoint, mass)`
    /// points, one per histogram bin.
    pub fn fit(points: &[(f64, f64)]) -> Result<Self, SafeguardError> {
        let usable = points.iter().filter(|&&(_, mass)| mass > 0.0).count();
        if usable < 2 {
            return Err(SafeguardError::InsufficientData {
                needed: 2,
                actual: usable,
            });
        }

        let (mean, stdev) =
            weighted_moments(points).ok_or(SafeguardError::InsufficientData {
                needed: 2,
                actual: usable,
            })?;
        if stdev <= 0.0 {
            // All mass in one location fits no spread.
            return Err(SafeguardError::InsufficientData {
                needed: 2,
                actual: 1,
            });
        }

        Ok(Self { mean, stdev })
    }

    /// Probability mass the model assigns to `[low, high]`.
    pub fn mass_between(&self, low: f64, high: f64) -> f64 {
        normal_cdf((high - self.mean) / self.stdev) - normal_cdf((low - self.mean) / self.stdev)
    }
}

/// A fitted line `y = slope * x + intercept` over a two-dimensional result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressionConstant {
    /// Slope.
    pub slope: f64,
    /// Intercept.
    pub intercept: f64,
}

impl LinearRegressionConstant {
    /// Fit by weighted least squares over `(x, y, weight)` points.
    pub fn fit(points: &[(f64, f64, f64)]) -> Result<Self, SafeguardError> {
        let mut xs: Vec<u64> = points
            .iter()
            .filter(|&&(_, _, w)| w > 0.0)
            .map(|&(x, _, _)| x.to_bits())
            .collect();
        xs.sort_unstable();
        xs.dedup();

        let line = fit_line_weighted(points).ok_or(SafeguardError::InsufficientData {
            needed: 2,
            actual: xs.len(),
        })?;

        Ok(Self {
            slope: line.slope,
            intercept: line.intercept,
        })
    }

    /// Model value at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Log-friendly rendering of a hypothesis target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstantLog {
    /// Value threshold.
    Value {
        /// The threshold.
        value: f64,
    },
    /// Rank threshold.
    Rank {
        /// The 1-based rank.
        rank: usize,
    },
    /// Interval target.
    Range {
        /// Representative point.
        center: f64,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Power-law model.
    PowerLaw {
        /// Scale factor.
        amplitude: f64,
        /// Exponent.
        exponent: f64,
    },
    /// Normal model.
    Normal {
        /// Location.
        mean: f64,
        /// Scale.
        stdev: f64,
    },
    /// Linear model.
    Linear {
        /// Slope.
        slope: f64,
        /// Intercept.
        intercept: f64,
    },
}

impl From<&ValueConstant> for ConstantLog {
    fn from(c: &ValueConstant) -> Self {
        ConstantLog::Value { value: c.value }
    }
}

impl From<&RankConstant> for ConstantLog {
    fn from(c: &RankConstant) -> Self {
        ConstantLog::Rank { rank: c.rank }
    }
}

impl From<&RangeConstant> for ConstantLog {
    fn from(c: &RangeConstant) -> Self {
        ConstantLog::Range {
            center: c.center,
            low: c.low,
            high: c.high,
        }
    }
}

impl From<&PowerLawConstant> for ConstantLog {
    fn from(c: &PowerLawConstant) -> Self {
        ConstantLog::PowerLaw {
            amplitude: c.amplitude,
            exponent: c.exponent,
        }
    }
}

impl From<&NormalConstant> for ConstantLog {
    fn from(c: &NormalConstant) -> Self {
        ConstantLog::Normal {
            mean: c.mean,
            stdev: c.stdev,
        }
    }
}

impl From<&LinearRegressionConstant> for ConstantLog {
    fn from(c: &LinearRegressionConstant) -> Self {
        ConstantLog::Linear {
            slope: c.slope,
            intercept: c.intercept,
        }
    }
}
