//! Relational operators used by hypotheses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The relation a hypothesis asserts between its subject and its target.
///
/// `Equal`, `LessThan`, and `GreaterThan` compare a group (or a pair of
/// groups) against a threshold; `InRange` asserts interval membership; and
/// `Follow` asserts that the whole result follows a model distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// The subject equals the target.
    Equal,
    /// The subject is strictly below the target.
    LessThan,
    /// The subject is strictly above the target.
    GreaterThan,
    /// The subject lies inside the target interval.
    InRange,
    /// The result follows the target model.
    Follow,
}

impl Operator {
    /// Whether this is a threshold comparison (`=`, `<`, `>`).
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Equal | Operator::LessThan | Operator::GreaterThan
        )
    }

    /// Flip the direction of an ordering comparison.
    ///
    /// Rank comparisons invert under this: a lower rank means a higher
    /// value, so `rank(A) < rank(B)` holds exactly when
    /// `value(A) > value(B)`.
    pub fn reversed(self) -> Self {
        match self {
            Operator::LessThan => Operator::GreaterThan,
            Operator::GreaterThan => Operator::LessThan,
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equal => "=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::InRange => "in",
            Operator::Follow => "~",
        };
        f.write_str(symbol)
    }
}
