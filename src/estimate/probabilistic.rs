//! Probabilistic estimators: exact tail probabilities under the normal
//! belief model.
//!
//! Each group's true value is modeled as `N(center, stdev^2)`, independent
//! across groups. The reported p-value is the probability that the
//! hypothesis does NOT hold under that belief, so it starts near 0.5 for an
//! uncertain result and converges to 0 or 1 as sampling narrows the
//! estimates.

use crate::config::Config;
use crate::error::SafeguardError;
use crate::query::ResultSnapshot;
use crate::safeguard::constant::{RangeConstant, RankConstant, ValueConstant};
use crate::safeguard::operator::Operator;
use crate::safeguard::validity::Validity;
use crate::safeguard::variable::{SingleVariable, VariablePair};
use crate::statistics::{normal_cdf, z_score};
use crate::types::ConfidenceEstimate;

use super::{clamp_unit, invalid_comparison, require_estimate};

/// Exceed probabilities this close to 0 or 1 are treated as settled and
/// kept out of the exact rank convolution.
const CERTAINTY_EPS: f64 = 1e-12;

/// p-value that a group's value fails `operator constant`.
pub fn value_p(
    snapshot: &ResultSnapshot,
    variable: &SingleVariable,
    operator: Operator,
    constant: &ValueConstant,
) -> Result<Validity, SafeguardError> {
    let estimate = require_estimate(snapshot, &variable.key)?;
    let p = comparison_p(estimate.center, estimate.stdev, operator, constant.value)?;
    Ok(Validity::PValue(p))
}

/// p-value that a group's value falls outside the target interval.
pub fn range_p(
    snapshot: &ResultSnapshot,
    variable: &SingleVariable,
    constant: &RangeConstant,
) -> Result<Validity, SafeguardError> {
    let estimate = require_estimate(snapshot, &variable.key)?;

    let p = if estimate.stdev == 0.0 {
        if constant.contains(estimate.center) {
            0.0
        } else {
            1.0
        }
    } else {
        let below_high = normal_cdf(z_score(constant.high, estimate.center, estimate.stdev));
        let below_low = normal_cdf(z_score(constant.low, estimate.center, estimate.stdev));
        clamp_unit(1.0 - (below_high - below_low))
    };
    Ok(Validity::PValue(p))
}

/// p-value that `first operator second` fails for two groups' values.
///
/// Rank-based pairs have no distributional form here; they are served by
/// [`comparative_bound`](super::comparative_bound).
pub fn comparative_p(
    snapshot: &ResultSnapshot,
    pair: &VariablePair,
    operator: Operator,
) -> Result<Validity, SafeguardError> {
    if pair.rank_based {
        return Err(SafeguardError::InvalidHypothesis(
            "rank comparisons are evaluated through value bounds".to_owned(),
        ));
    }

    let first = require_estimate(snapshot, &pair.first.key)?;
    let second = require_estimate(snapshot, &pair.second.key)?;

    // The difference of two independent normal beliefs is normal with
    // summed variances; the comparison then reduces to a zero threshold.
    let center = first.center - second.center;
    let stdev = (first.stdev * first.stdev + second.stdev * second.stdev).sqrt();
    let p = comparison_p(center, stdev, operator, 0.0)?;
    Ok(Validity::PValue(p))
}

/// p-value that a group's rank (1 = largest value) fails
/// `operator constant`.
///
/// The number of groups ranked above the subject is a sum of independent
/// indicator variables, one per competitor, with success probability
/// `P(competitor > subject)`. Its distribution is computed by exact
/// convolution over the competitors that are genuinely contested;
/// all-but-settled competitors are counted directly, and when more than
/// [`Config::max_rank_competitors`] remain contested the most uncertain are
/// convolved exactly and the rest rounded to their likelier side.
pub fn rank_p(
    snapshot: &ResultSnapshot,
    variable: &SingleVariable,
    operator: Operator,
    constant: &RankConstant,
    config: &Config,
) -> Result<Validity, SafeguardError> {
    if snapshot.len() < 2 {
        return Err(SafeguardError::InsufficientData {
            needed: 2,
            actual: snapshot.len(),
        });
    }
    if !operator.is_comparison() {
        return Err(invalid_comparison(operator));
    }
    let subject = require_estimate(snapshot, &variable.key)?;

    let mut certain_above = 0usize;
    let mut contested: Vec<f64> = Vec::new();
    for row in snapshot.rows() {
        if row.key == variable.key {
            continue;
        }
        let p = exceed_probability(&row.estimate, subject);
        if p >= 1.0 - CERTAINTY_EPS {
            certain_above += 1;
        } else if p > CERTAINTY_EPS {
            contested.push(p);
        }
    }

    if contested.len() > config.max_rank_competitors {
        // Keep the most uncertain competitors for the exact convolution and
        // round the rest to their likelier side.
        contested.sort_unstable_by(|a, b| (a - 0.5).abs().total_cmp(&(b - 0.5).abs()));
        for &p in &contested[config.max_rank_competitors..] {
            if p >= 0.5 {
                certain_above += 1;
            }
        }
        contested.truncate(config.max_rank_competitors);
    }

    // dist[j] = P(j of the contested competitors rank above the subject).
    let dist = poisson_binomial(&contested);
    let above = certain_above as i64;

    let eq = |k: i64| -> f64 {
        if k < above {
            0.0
        } else {
            dist.get((k - above) as usize).copied().unwrap_or(0.0)
        }
    };
    let le = |k: i64| -> f64 {
        if k < above {
            return 0.0;
        }
        let j = (k - above) as usize;
        dist.iter().take(j + 1).sum()
    };

    // The subject's rank is one more than the number of groups above it.
    let rank = constant.rank as i64;
    let holds = match operator {
        Operator::Equal => eq(rank - 1),
        Operator::LessThan => le(rank - 2),
        Operator::GreaterThan => 1.0 - le(rank - 1),
        other => return Err(invalid_comparison(other)),
    };

    Ok(Validity::PValue(clamp_unit(1.0 - holds)))
}

/// p-value for a threshold comparison of one normal belief.
fn comparison_p(
    center: f64,
    stdev: f64,
    operator: Operator,
    threshold: f64,
) -> Result<f64, SafeguardError> {
    if stdev == 0.0 {
        let holds = match operator {
            Operator::Equal => center == threshold,
            Operator::LessThan => center < threshold,
            Operator::GreaterThan => center > threshold,
            other => return Err(invalid_comparison(other)),
        };
        return Ok(if holds { 0.0 } else { 1.0 });
    }

    // P(true value <= threshold) under N(center, stdev^2).
    let z = z_score(threshold, center, stdev);
    let p = match operator {
        Operator::GreaterThan => normal_cdf(z),
        Operator::LessThan => 1.0 - normal_cdf(z),
        // One minus the two-sided tail mass at the threshold's distance:
        // zero when the estimate sits on the threshold, one far away.
        Operator::Equal => 2.0 * normal_cdf(z.abs()) - 1.0,
        other => return Err(invalid_comparison(other)),
    };
    Ok(clamp_unit(p))
}

/// P(competitor's true value exceeds the subject's).
///
/// With both beliefs settled, a tie does not outrank the subject.
fn exceed_probability(competitor: &ConfidenceEstimate, subject: &ConfidenceEstimate) -> f64 {
    let variance = competitor.stdev * competitor.stdev + subject.stdev * subject.stdev;
    if variance == 0.0 {
        return if competitor.center > subject.center {
            1.0
        } else {
            0.0
        };
    }
    normal_cdf(z_score(competitor.center, subject.center, variance.sqrt()))
}

/// Exact distribution of the number of successes among independent
/// Bernoulli trials with the given probabilities.
fn poisson_binomial(probabilities: &[f64]) -> Vec<f64> {
    let mut dist = vec![0.0; probabilities.len() + 1];
    dist[0] = 1.0;
    for (i, &p) in probabilities.iter().enumerate() {
        for j in (1..=i + 1).rev() {
            dist[j] = dist[j] * (1.0 - p) + dist[j - 1] * p;
        }
        dist[0] *= 1.0 - p;
    }
    dist
}
