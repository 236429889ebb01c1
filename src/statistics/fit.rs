//! Least-squares fitting and residual summaries.

use nalgebra::{SMatrix, SVector};

type Matrix2 = SMatrix<f64, 2, 2>;
type Vector2 = SVector<f64, 2>;

/// A fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Constant term.
    pub intercept: f64,
    /// Slope.
    pub slope: f64,
}

impl LineFit {
    /// Evaluate the line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares over `(x, y)` points.
///
/// Returns `None` when the system is singular (fewer than two points, or
/// no spread in `x`).
pub fn fit_line(points: &[(f64, f64)]) -> Option<LineFit> {
    let weighted: Vec<(f64, f64, f64)> = points.iter().map(|&(x, y)| (x, y, 1.0)).collect();
    fit_line_weighted(&weighted)
}

/// Weighted least squares over `(x, y, weight)` points.
///
/// Solves the 2x2 normal equations `X^T W X b = X^T W y` by Cholesky
/// factorization. Points with non-positive weight are ignored. Returns
/// `None` when the remaining system is singular.
pub fn fit_line_weighted(points: &[(f64, f64, f64)]) -> Option<LineFit> {
    let mut sw = 0.0;
    let mut swx = 0.0;
    let mut swxx = 0.0;
    let mut swy = 0.0;
    let mut swxy = 0.0;

    for &(x, y, w) in points {
        if w <= 0.0 {
            continue;
        }
        sw += w;
        swx += w * x;
        swxx += w * x * x;
        swy += w * y;
        swxy += w * x * y;
    }

    if sw <= 0.0 {
        return None;
    }

    let xtwx = Matrix2::new(sw, swx, swx, swxx);
    let xtwy = Vector2::new(swy, swxy);

    // Cholesky fails exactly when X^T W X is not positive definite, which
    // covers the zero-spread and single-point cases.
    let solution = xtwx.cholesky()?.solve(&xtwy);
    if !solution[0].is_finite() || !solution[1].is_finite() {
        return None;
    }

    Some(LineFit {
        intercept: solution[0],
        slope: solution[1],
    })
}

/// Weighted mean and standard deviation of `(value, weight)` points.
///
/// Returns `None` when the total weight is not positive. Points with
/// non-positive weight are ignored. The returned stdev is zero when all
/// weight sits on one value.
pub fn weighted_moments(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut sw = 0.0;
    let mut swx = 0.0;
    for &(x, w) in points {
        if w <= 0.0 {
            continue;
        }
        sw += w;
        swx += w * x;
    }
    if sw <= 0.0 {
        return None;
    }
    let mean = swx / sw;

    let mut swd = 0.0;
    for &(x, w) in points {
        if w <= 0.0 {
            continue;
        }
        let d = x - mean;
        swd += w * d * d;
    }
    let variance = (swd / sw).max(0.0);

    Some((mean, variance.sqrt()))
}

/// Root-mean-square difference between observed and predicted values.
///
/// # Panics
///
/// Panics when the slices are empty or of unequal length.
pub fn rms_residual(observed: &[f64], predicted: &[f64]) -> f64 {
    assert_eq!(observed.len(), predicted.len(), "mismatched series lengths");
    assert!(!observed.is_empty(), "no residuals to summarize");

    let sum: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    (sum / observed.len() as f64).sqrt()
}

/// Weighted root-mean-square difference, with weights normalized by their sum.
///
/// # Panics
///
/// Panics when the slices are empty, of unequal length, or the total
/// weight is not positive.
pub fn weighted_rms_residual(observed: &[f64], predicted: &[f64], weights: &[f64]) -> f64 {
    assert_eq!(observed.len(), predicted.len(), "mismatched series lengths");
    assert_eq!(observed.len(), weights.len(), "mismatched series lengths");
    assert!(!observed.is_empty(), "no residuals to summarize");

    let mut sw = 0.0;
    let mut swd = 0.0;
    for ((o, p), w) in observed.iter().zip(predicted).zip(weights) {
        assert!(*w >= 0.0, "weights must be non-negative");
        let d = o - p;
        sw += w;
        swd += w * d * d;
    }
    assert!(sw > 0.0, "total weight must be positive");

    (swd / sw).sqrt()
}

/// Goodness-of-fit score in `(0, 1]`, where 1 is a perfect fit.
///
/// The RMS residual is normalized by the spread of the observed values so
/// the score is scale-free: `q = 1 / (1 + rms / spread)`. When the
/// observations have no spread the raw RMS is used instead.
pub fn fit_quality(observed: &[f64], predicted: &[f64]) -> f64 {
    let rms = rms_residual(observed, predicted);

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &o in observed {
        min = min.min(o);
        max = max.max(o);
    }
    let spread = max - min;

    if spread > 0.0 {
        1.0 / (1.0 + rms / spread)
    } else {
        1.0 / (1.0 + rms)
    }
}
