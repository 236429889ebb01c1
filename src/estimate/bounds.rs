//! Bound-based estimators for approximators without a distributional
//! model (e.g. min/max).
//!
//! Only the `[low, high]` interval of each estimate is trusted. A
//! hypothesis is then certainly true, certainly false, or undecidable from
//! the current bounds; the three-way verdict is reported on the p-value
//! scale so safeguards keep a single score axis per type.

use crate::error::SafeguardError;
use crate::query::ResultSnapshot;
use crate::safeguard::constant::{RangeConstant, RankConstant, ValueConstant};
use crate::safeguard::operator::Operator;
use crate::safeguard::validity::Validity;
use crate::safeguard::variable::{SingleVariable, VariablePair};
use crate::types::ConfidenceEstimate;

use super::{invalid_comparison, require_estimate};

/// What the current bounds prove about a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundVerdict {
    /// Every value consistent with the bounds satisfies the hypothesis.
    CertainlyHolds,
    /// The bounds admit both outcomes.
    Undecided,
    /// No value consistent with the bounds satisfies the hypothesis.
    CertainlyViolated,
}

impl BoundVerdict {
    /// The verdict on the p-value scale: 0, 0.5, or 1.
    pub fn as_p(self) -> f64 {
        match self {
            BoundVerdict::CertainlyHolds => 0.0,
            BoundVerdict::Undecided => 0.5,
            BoundVerdict::CertainlyViolated => 1.0,
        }
    }
}

impl From<BoundVerdict> for Validity {
    fn from(verdict: BoundVerdict) -> Self {
        Validity::PValue(verdict.as_p())
    }
}

/// Bound verdict for a group's value against `operator constant`.
pub fn value_bound(
    snapshot: &ResultSnapshot,
    variable: &SingleVariable,
    operator: Operator,
    constant: &ValueConstant,
) -> Result<Validity, SafeguardError> {
    let estimate = require_estimate(snapshot, &variable.key)?;
    let verdict = threshold_verdict(estimate, operator, constant.value)?;
    Ok(verdict.into())
}

/// Bound verdict for a group's value against the target interval.
///
/// Holds when the estimate's interval is contained in the target, is
/// violated when they are disjoint, and is undecided on partial overlap.
pub fn range_bound(
    snapshot: &ResultSnapshot,
    variable: &SingleVariable,
    constant: &RangeConstant,
) -> Result<Validity, SafeguardError> {
    let estimate = require_estimate(snapshot, &variable.key)?;

    let verdict = if estimate.high < constant.low || estimate.low > constant.high {
        BoundVerdict::CertainlyViolated
    } else if constant.low <= estimate.low && estimate.high <= constant.high {
        BoundVerdict::CertainlyHolds
    } else {
        BoundVerdict::Undecided
    };
    Ok(verdict.into())
}

/// Bound verdict for `first operator second` over two groups.
///
/// Rank-based pairs compare through the value intervals with the ordering
/// reversed, since a lower rank means a higher value. Rank equality is
/// value equality.
pub fn comparative_bound(
    snapshot: &ResultSnapshot,
    pair: &VariablePair,
    operator: Operator,
) -> Result<Validity, SafeguardError> {
    let first = require_estimate(snapshot, &pair.first.key)?;
    let second = require_estimate(snapshot, &pair.second.key)?;

    let effective = if pair.rank_based {
        operator.reversed()
    } else {
        operator
    };

    let verdict = match effective {
        Operator::LessThan => interval_less_than(first, second),
        Operator::GreaterThan => interval_less_than(second, first),
        Operator::Equal => {
            if first.is_degenerate() && second.is_degenerate() {
                if first.center == second.center {
                    BoundVerdict::CertainlyHolds
                } else {
                    BoundVerdict::CertainlyViolated
                }
            } else if first.high < second.low || second.high < first.low {
                BoundVerdict::CertainlyViolated
            } else {
                BoundVerdict::Undecided
            }
        }
        other => return Err(invalid_comparison(other)),
    };
    Ok(verdict.into())
}

/// Bound verdict for a group's rank against `operator constant`.
///
/// The bounds confine the subject's rank to a band: at best, only the
/// competitors certainly above it outrank it; at worst, every competitor
/// that could possibly exceed it does.
pub fn rank_bound(
    snapshot: &ResultSnapshot,
    variable: &SingleVariable,
    operator: Operator,
    constant: &RankConstant,
) -> Result<Validity, SafeguardError> {
    if snapshot.len() < 2 {
        return Err(SafeguardError::InsufficientData {
            needed: 2,
            actual: snapshot.len(),
        });
    }
    let subject = require_estimate(snapshot, &variable.key)?;

    let mut certainly_above = 0usize;
    let mut possibly_above = 0usize;
    for row in snapshot.rows() {
        if row.key == variable.key {
            continue;
        }
        if row.estimate.low > subject.high {
            certainly_above += 1;
        }
        if row.estimate.high > subject.low {
            possibly_above += 1;
        }
    }

    let best = 1 + certainly_above;
    let worst = 1 + possibly_above;
    let rank = constant.rank;

    let verdict = match operator {
        Operator::Equal => {
            if rank < best || rank > worst {
                BoundVerdict::CertainlyViolated
            } else if best == worst {
                BoundVerdict::CertainlyHolds
            } else {
                BoundVerdict::Undecided
            }
        }
        Operator::LessThan => {
            if worst < rank {
                BoundVerdict::CertainlyHolds
            } else if best >= rank {
                BoundVerdict::CertainlyViolated
            } else {
                BoundVerdict::Undecided
            }
        }
        Operator::GreaterThan => {
            if best > rank {
                BoundVerdict::CertainlyHolds
            } else if worst <= rank {
                BoundVerdict::CertainlyViolated
            } else {
                BoundVerdict::Undecided
            }
        }
        other => return Err(invalid_comparison(other)),
    };
    Ok(verdict.into())
}

/// Three-way verdict for one interval against a scalar threshold.
///
/// Ties satisfy `Equal` and violate the strict orderings.
fn threshold_verdict(
    estimate: &ConfidenceEstimate,
    operator: Operator,
    threshold: f64,
) -> Result<BoundVerdict, SafeguardError> {
    let verdict = match operator {
        Operator::Equal => {
            if !estimate.contains(threshold) {
                BoundVerdict::CertainlyViolated
            } else if estimate.is_degenerate() {
                BoundVerdict::CertainlyHolds
            } else {
                BoundVerdict::Undecided
            }
        }
        Operator::LessThan => {
            if estimate.high < threshold {
                BoundVerdict::CertainlyHolds
            } else if estimate.low >= threshold {
                BoundVerdict::CertainlyViolated
            } else {
                BoundVerdict::Undecided
            }
        }
        Operator::GreaterThan => {
            if estimate.low > threshold {
                BoundVerdict::CertainlyHolds
            } else if estimate.high <= threshold {
                BoundVerdict::CertainlyViolated
            } else {
                BoundVerdict::Undecided
            }
        }
        other => return Err(invalid_comparison(other)),
    };
    Ok(verdict)
}

/// Verdict for `a < b` over two intervals.
fn interval_less_than(a: &ConfidenceEstimate, b: &ConfidenceEstimate) -> BoundVerdict {
    if a.high < b.low {
        BoundVerdict::CertainlyHolds
    } else if a.low >= b.high {
        BoundVerdict::CertainlyViolated
    } else {
        BoundVerdict::Undecided
    }
}
