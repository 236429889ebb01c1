//! Fit-based estimators for whole-result hypotheses.
//!
//! These score how well a previously fitted model still describes the
//! current result. They read estimate centers only; interval widths do not
//! enter, so the same estimators serve distributional and bound-only
//! approximators alike.

use crate::config::Config;
use crate::error::SafeguardError;
use crate::query::ResultSnapshot;
use crate::safeguard::constant::{LinearRegressionConstant, NormalConstant, PowerLawConstant};
use crate::safeguard::validity::Validity;
use crate::statistics::{fit_quality, weighted_rms_residual};

/// Goodness of fit of a power-law model to the value-descending series.
pub fn power_law_quality(
    snapshot: &ResultSnapshot,
    constant: &PowerLawConstant,
    config: &Config,
) -> Result<Validity, SafeguardError> {
    let series = power_law_series(snapshot, config)?;
    let predicted: Vec<f64> = (1..=series.len())
        .map(|rank| constant.predict(rank as f64))
        .collect();
    Ok(Validity::Quality(fit_quality(&series, &predicted)))
}

/// Goodness of fit of a normal model to the histogram over the first
/// binned axis.
pub fn normal_quality(
    snapshot: &ResultSnapshot,
    constant: &NormalConstant,
    config: &Config,
) -> Result<Validity, SafeguardError> {
    let bins = binned_masses(snapshot, config)?;
    let total: f64 = bins.iter().map(|&(_, _, mass)| mass).sum();
    if total <= 0.0 {
        return Err(SafeguardError::InsufficientData {
            needed: 2,
            actual: 0,
        });
    }

    let observed: Vec<f64> = bins.iter().map(|&(_, _, mass)| mass).collect();
    let predicted: Vec<f64> = bins
        .iter()
        .map(|&(low, high, _)| total * constant.mass_between(low, high))
        .collect();
    Ok(Validity::Quality(fit_quality(&observed, &predicted)))
}

/// Residual error of a linear model over the result's numeric plane,
/// in the data's units.
pub fn linear_error(
    snapshot: &ResultSnapshot,
    constant: &LinearRegressionConstant,
    config: &Config,
) -> Result<Validity, SafeguardError> {
    let points = planar_points(snapshot, config)?;
    let observed: Vec<f64> = points.iter().map(|&(_, y, _)| y).collect();
    let predicted: Vec<f64> = points.iter().map(|&(x, _, _)| constant.predict(x)).collect();
    let weights: Vec<f64> = points.iter().map(|&(_, _, w)| w).collect();
    Ok(Validity::Error(weighted_rms_residual(
        &observed, &predicted, &weights,
    )))
}

/// Positive estimate centers in descending order; the 1-based position is
/// the rank.
///
/// Results larger than [`Config::max_fit_points`] are truncated to the top
/// ranks, where a decaying power law carries its shape.
pub fn power_law_series(
    snapshot: &ResultSnapshot,
    config: &Config,
) -> Result<Vec<f64>, SafeguardError> {
    let mut series: Vec<f64> = snapshot
        .rows()
        .iter()
        .map(|row| row.estimate.center)
        .filter(|&center| center > 0.0)
        .collect();

    if series.len() < 2 {
        return Err(SafeguardError::InsufficientData {
            needed: 2,
            actual: series.len(),
        });
    }

    series.sort_unstable_by(|a, b| b.total_cmp(a));
    series.truncate(config.max_fit_points);
    Ok(series)
}

/// `(low, high, mass)` per group over the first binned axis, in bin order.
///
/// Mass is the estimate center clamped at zero. Groups without a numeric
/// position on that axis (the null group) are skipped.
pub fn binned_masses(
    snapshot: &ResultSnapshot,
    config: &Config,
) -> Result<Vec<(f64, f64, f64)>, SafeguardError> {
    let axis = snapshot.first_binned_axis().ok_or_else(|| {
        SafeguardError::InvalidHypothesis(
            "distribution hypotheses need a binned grouping axis".to_owned(),
        )
    })?;

    let mut bins: Vec<(f64, f64, f64)> = snapshot
        .rows()
        .iter()
        .filter_map(|row| {
            let (low, high) = snapshot.axis_bounds(axis, &row.key)?;
            Some((low, high, row.estimate.center.max(0.0)))
        })
        .collect();

    if bins.len() < 2 {
        return Err(SafeguardError::InsufficientData {
            needed: 2,
            actual: bins.len(),
        });
    }

    bins.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
    Ok(cap_evenly(bins, config.max_fit_points))
}

/// `(x, y, weight)` points for a linear fit.
///
/// With two binned axes the points are cell midpoints weighted by cell
/// mass (empty cells are skipped); with one binned axis they are
/// `(midpoint, center)` with unit weight.
pub fn planar_points(
    snapshot: &ResultSnapshot,
    config: &Config,
) -> Result<Vec<(f64, f64, f64)>, SafeguardError> {
    let binned: Vec<usize> = snapshot
        .axes()
        .iter()
        .enumerate()
        .filter(|(_, scale)| scale.is_binned())
        .map(|(i, _)| i)
        .collect();

    let mut points: Vec<(f64, f64, f64)> = match binned.as_slice() {
        [] => {
            return Err(SafeguardError::InvalidHypothesis(
                "a linear hypothesis needs a binned grouping axis".to_owned(),
            ))
        }
        [x_axis] => snapshot
            .rows()
            .iter()
            .filter_map(|row| {
                let x = snapshot.axis_midpoint(*x_axis, &row.key)?;
                Some((x, row.estimate.center, 1.0))
            })
            .collect(),
        [x_axis, y_axis, ..] => snapshot
            .rows()
            .iter()
            .filter_map(|row| {
                let x = snapshot.axis_midpoint(*x_axis, &row.key)?;
                let y = snapshot.axis_midpoint(*y_axis, &row.key)?;
                let mass = row.estimate.center;
                (mass > 0.0).then_some((x, y, mass))
            })
            .collect(),
    };

    if points.len() < 2 {
        return Err(SafeguardError::InsufficientData {
            needed: 2,
            actual: points.len(),
        });
    }

    points.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    Ok(cap_evenly(points, config.max_fit_points))
}

/// Thin a sorted point set to at most `cap` entries with an even stride.
fn cap_evenly<T>(mut points: Vec<T>, cap: usize) -> Vec<T> {
    if points.len() <= cap {
        return points;
    }
    let stride = points.len().div_ceil(cap);
    let mut i = 0;
    points.retain(|_| {
        let keep = i % stride == 0;
        i += 1;
        keep
    });
    points
}
