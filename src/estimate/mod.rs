//! Validity estimators.
//!
//! Every estimator is a pure function from a [`ResultSnapshot`] and a
//! hypothesis to a [`Validity`](crate::safeguard::Validity) score. Two
//! families cover the threshold safeguards, selected by the query's
//! approximator:
//!
//! - The probabilistic family ([`value_p`], [`range_p`], [`comparative_p`],
//!   [`rank_p`]) treats each estimate as a normal belief `N(center, stdev^2)`
//!   and reports exact tail probabilities.
//! - The bound family ([`value_bound`], [`range_bound`], [`comparative_bound`],
//!   [`rank_bound`]) uses only the `[low, high]` intervals and reports a
//!   three-way [`BoundVerdict`] on the p-value scale.
//!
//! The distributive safeguards (power law, normal, linear) have a single
//! family ([`power_law_quality`], [`normal_quality`], [`linear_error`]),
//! since goodness of fit is computed from centers either way.

mod bounds;
mod distribution;
mod probabilistic;

pub use bounds::{comparative_bound, range_bound, rank_bound, value_bound, BoundVerdict};
pub use distribution::{
    binned_masses, linear_error, normal_quality, planar_points, power_law_quality,
    power_law_series,
};
pub use probabilistic::{comparative_p, range_p, rank_p, value_p};

use crate::error::SafeguardError;
use crate::query::ResultSnapshot;
use crate::safeguard::operator::Operator;
use crate::types::{ConfidenceEstimate, GroupKey};

/// Look up a group's estimate, failing with a stale reference when the
/// group has dropped out of the result.
fn require_estimate<'a>(
    snapshot: &'a ResultSnapshot,
    key: &GroupKey,
) -> Result<&'a ConfidenceEstimate, SafeguardError> {
    snapshot
        .estimate(key)
        .ok_or_else(|| SafeguardError::StaleReference { key: key.clone() })
}

fn invalid_comparison(operator: Operator) -> SafeguardError {
    SafeguardError::InvalidHypothesis(format!(
        "operator {operator} is not a threshold comparison"
    ))
}

fn clamp_unit(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}
