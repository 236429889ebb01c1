//! Hypothesis subjects: which part of the result a safeguard watches.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::GroupKey;

/// A single group whose aggregate value (or rank) a hypothesis is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SingleVariable {
    /// The watched group.
    pub key: GroupKey,
}

impl SingleVariable {
    /// Watch one group.
    pub fn new(key: GroupKey) -> Self {
        Self { key }
    }
}

impl fmt::Display for SingleVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Two groups compared against each other.
///
/// When `rank_based` is set the comparison is between the groups' ranks in
/// the value-descending ordering rather than between their values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariablePair {
    /// Left-hand group.
    pub first: SingleVariable,
    /// Right-hand group.
    pub second: SingleVariable,
    /// Compare ranks instead of values.
    pub rank_based: bool,
}

impl VariablePair {
    /// Compare the two groups' values.
    ///
    /// # Panics
    ///
    /// Panics when both sides name the same group.
    pub fn new(first: SingleVariable, second: SingleVariable) -> Self {
        assert!(
            first.key != second.key,
            "a comparison needs two distinct groups"
        );
        Self {
            first,
            second,
            rank_based: false,
        }
    }

    /// Compare the two groups' ranks.
    ///
    /// # Panics
    ///
    /// Panics when both sides name the same group.
    pub fn rank_based(first: SingleVariable, second: SingleVariable) -> Self {
        let mut pair = Self::new(first, second);
        pair.rank_based = true;
        pair
    }
}

impl fmt::Display for VariablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rank_based {
            write!(f, "rank({}) vs rank({})", self.first, self.second)
        } else {
            write!(f, "{} vs {}", self.first, self.second)
        }
    }
}

/// The whole current result set, the subject of distribution-shape
/// hypotheses. Carries no key: the fit input is whatever groups the
/// snapshot holds when the model is (re)fitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributiveVariable;

impl fmt::Display for DistributiveVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("everything")
    }
}

/// Log-friendly rendering of a hypothesis subject.
///
/// Distributive hypotheses (power law, normal, linear) range over the whole
/// result rather than named groups, so they log as `Everything`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariableLog {
    /// One group.
    Single {
        /// The watched group, rendered for display.
        key: String,
    },
    /// Two groups under comparison.
    Pair {
        /// Left-hand group.
        first: String,
        /// Right-hand group.
        second: String,
        /// Whether ranks were compared instead of values.
        rank_based: bool,
    },
    /// The whole result.
    Everything,
}

impl From<&SingleVariable> for VariableLog {
    fn from(variable: &SingleVariable) -> Self {
        VariableLog::Single {
            key: variable.key.to_string(),
        }
    }
}

impl From<&VariablePair> for VariableLog {
    fn from(pair: &VariablePair) -> Self {
        VariableLog::Pair {
            first: pair.first.key.to_string(),
            second: pair.second.key.to_string(),
            rank_based: pair.rank_based,
        }
    }
}

impl From<DistributiveVariable> for VariableLog {
    fn from(_: DistributiveVariable) -> Self {
        VariableLog::Everything
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_displays_both_sides() {
        let pair = VariablePair::new(
            SingleVariable::new(GroupKey::from("China")),
            SingleVariable::new(GroupKey::from("India")),
        );
        assert_eq!(pair.to_string(), "China vs India");

        let ranked = VariablePair::rank_based(
            SingleVariable::new(GroupKey::from("China")),
            SingleVariable::new(GroupKey::from("India")),
        );
        assert_eq!(ranked.to_string(), "rank(China) vs rank(India)");
    }

    #[test]
    #[should_panic(expected = "two distinct groups")]
    fn self_comparison_panics() {
        VariablePair::new(
            SingleVariable::new(GroupKey::from("A")),
            SingleVariable::new(GroupKey::from("A")),
        );
    }

    #[test]
    fn log_form_is_tagged() {
        let log = VariableLog::from(&SingleVariable::new(GroupKey::from("A")));
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["kind"], "single");
        assert_eq!(json["key"], "A");
    }
}
