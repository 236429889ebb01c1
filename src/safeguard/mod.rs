//! Safeguards: pinned hypotheses that score themselves against a
//! progressively refined result.
//!
//! A safeguard binds a hypothesis (what the user believes about the final
//! result) to the live query it is about. As sampling proceeds, the caller
//! asks the safeguard to re-score itself; the score converges along with
//! the estimates, and the recorded history shows that convergence.

pub mod constant;
pub mod operator;
pub mod validity;
pub mod variable;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::SafeguardError;
use crate::estimate;
use crate::query::{QueryRef, QuerySummary, ResultSnapshot};

use self::constant::{
    ConstantLog, LinearRegressionConstant, NormalConstant, PowerLawConstant, RankConstant,
    RangeConstant, ValueConstant,
};
use self::operator::Operator;
use self::validity::{Validity, ValidityKind, ValidityRecord};
use self::variable::{DistributiveVariable, SingleVariable, VariableLog, VariablePair};

/// The seven safeguard types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeguardType {
    /// One group's value against a threshold.
    Value,
    /// One group's rank against a threshold.
    Rank,
    /// One group's value against an interval.
    Range,
    /// Two groups against each other.
    Comparative,
    /// The whole result against a power-law model.
    PowerLaw,
    /// The whole result against a normal model.
    Normal,
    /// The whole result against a linear model.
    Linear,
}

impl SafeguardType {
    /// Whether the hypothesis ranges over the whole result rather than
    /// named groups.
    pub fn is_distributive(self) -> bool {
        matches!(
            self,
            SafeguardType::PowerLaw | SafeguardType::Normal | SafeguardType::Linear
        )
    }

    /// The score family this type reports. Fixed per type, so successive
    /// scores of one safeguard are always comparable.
    pub fn validity_kind(self) -> ValidityKind {
        match self {
            SafeguardType::Value
            | SafeguardType::Rank
            | SafeguardType::Range
            | SafeguardType::Comparative => ValidityKind::PValue,
            SafeguardType::PowerLaw | SafeguardType::Normal => ValidityKind::Quality,
            SafeguardType::Linear => ValidityKind::Error,
        }
    }
}

impl fmt::Display for SafeguardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafeguardType::Value => "value",
            SafeguardType::Rank => "rank",
            SafeguardType::Range => "range",
            SafeguardType::Comparative => "comparative",
            SafeguardType::PowerLaw => "power law",
            SafeguardType::Normal => "normal",
            SafeguardType::Linear => "linear",
        };
        f.write_str(name)
    }
}

/// A hypothesis: subject, relation, and target, one variant per safeguard
/// type.
#[derive(Debug, Clone, PartialEq)]
pub enum Hypothesis {
    /// A group's value compares to a threshold.
    Value {
        /// The watched group.
        variable: SingleVariable,
        /// The asserted relation.
        operator: Operator,
        /// The threshold.
        constant: ValueConstant,
    },
    /// A group's rank compares to a threshold.
    Rank {
        /// The watched group.
        variable: SingleVariable,
        /// The asserted relation.
        operator: Operator,
        /// The rank threshold.
        constant: RankConstant,
    },
    /// A group's value lies in an interval.
    Range {
        /// The watched group.
        variable: SingleVariable,
        /// The target interval.
        constant: RangeConstant,
    },
    /// Two groups' values (or ranks) compare to each other.
    Comparative {
        /// The compared groups.
        pair: VariablePair,
        /// The asserted relation.
        operator: Operator,
    },
    /// The result follows a power law.
    PowerLaw {
        /// The fitted model.
        constant: PowerLawConstant,
    },
    /// The result follows a normal distribution.
    Normal {
        /// The fitted model.
        constant: NormalConstant,
    },
    /// The result follows a line.
    Linear {
        /// The fitted model.
        constant: LinearRegressionConstant,
    },
}

impl Hypothesis {
    /// The safeguard type of this hypothesis.
    pub fn safeguard_type(&self) -> SafeguardType {
        match self {
            Hypothesis::Value { .. } => SafeguardType::Value,
            Hypothesis::Rank { .. } => SafeguardType::Rank,
            Hypothesis::Range { .. } => SafeguardType::Range,
            Hypothesis::Comparative { .. } => SafeguardType::Comparative,
            Hypothesis::PowerLaw { .. } => SafeguardType::PowerLaw,
            Hypothesis::Normal { .. } => SafeguardType::Normal,
            Hypothesis::Linear { .. } => SafeguardType::Linear,
        }
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hypothesis::Value {
                variable,
                operator,
                constant,
            } => write!(f, "{variable} {operator} {}", constant.value),
            Hypothesis::Rank {
                variable,
                operator,
                constant,
            } => write!(f, "rank({variable}) {operator} {}", constant.rank),
            Hypothesis::Range { variable, constant } => {
                write!(f, "{variable} in [{}, {}]", constant.low, constant.high)
            }
            Hypothesis::Comparative { pair, operator } => {
                if pair.rank_based {
                    write!(f, "rank({}) {operator} rank({})", pair.first, pair.second)
                } else {
                    write!(f, "{} {operator} {}", pair.first, pair.second)
                }
            }
            Hypothesis::PowerLaw { constant } => write!(
                f,
                "follows power law (a = {:.4}, b = {:.4})",
                constant.amplitude, constant.exponent
            ),
            Hypothesis::Normal { constant } => write!(
                f,
                "follows normal (mean = {:.4}, stdev = {:.4})",
                constant.mean, constant.stdev
            ),
            Hypothesis::Linear { constant } => write!(
                f,
                "follows line (slope = {:.4}, intercept = {:.4})",
                constant.slope, constant.intercept
            ),
        }
    }
}

/// A pinned hypothesis bound to its query.
pub struct Safeguard {
    hypothesis: Hypothesis,
    query: QueryRef,
    config: Config,
    created_at: SystemTime,
    last_updated_at: SystemTime,
    history: Vec<ValidityRecord>,
}

impl Safeguard {
    /// Pin a hypothesis against a query.
    ///
    /// Fails when the hypothesis is malformed for its type, e.g. an
    /// `InRange` operator on a value comparison.
    pub fn new(query: QueryRef, hypothesis: Hypothesis) -> Result<Self, SafeguardError> {
        match &hypothesis {
            Hypothesis::Value { operator, .. }
            | Hypothesis::Rank { operator, .. }
            | Hypothesis::Comparative { operator, .. } => {
                if !operator.is_comparison() {
                    return Err(SafeguardError::InvalidHypothesis(format!(
                        "operator {operator} is not a threshold comparison"
                    )));
                }
            }
            Hypothesis::Range { .. }
            | Hypothesis::PowerLaw { .. }
            | Hypothesis::Normal { .. }
            | Hypothesis::Linear { .. } => {}
        }

        let now = SystemTime::now();
        Ok(Self {
            hypothesis,
            query,
            config: Config::default(),
            created_at: now,
            last_updated_at: now,
            history: Vec::new(),
        })
    }

    /// Pin a value hypothesis: `group operator threshold`.
    pub fn value(
        query: QueryRef,
        variable: SingleVariable,
        operator: Operator,
        constant: ValueConstant,
    ) -> Result<Self, SafeguardError> {
        Self::new(
            query,
            Hypothesis::Value {
                variable,
                operator,
                constant,
            },
        )
    }

    /// Pin a rank hypothesis: `rank(group) operator threshold`.
    pub fn rank(
        query: QueryRef,
        variable: SingleVariable,
        operator: Operator,
        constant: RankConstant,
    ) -> Result<Self, SafeguardError> {
        Self::new(
            query,
            Hypothesis::Rank {
                variable,
                operator,
                constant,
            },
        )
    }

    /// Pin a range hypothesis: `group in [low, high]`.
    pub fn range(
        query: QueryRef,
        variable: SingleVariable,
        constant: RangeConstant,
    ) -> Result<Self, SafeguardError> {
        Self::new(query, Hypothesis::Range { variable, constant })
    }

    /// Pin a comparative hypothesis: `first operator second`.
    pub fn comparative(
        query: QueryRef,
        pair: VariablePair,
        operator: Operator,
    ) -> Result<Self, SafeguardError> {
        Self::new(query, Hypothesis::Comparative { pair, operator })
    }

    /// Pin a power-law hypothesis, fitting the model to the current result.
    pub fn power_law(query: QueryRef) -> Result<Self, SafeguardError> {
        let config = Config::default();
        let snapshot = query.snapshot();
        let series = estimate::power_law_series(&snapshot, &config)?;
        let constant = PowerLawConstant::fit(&series)?;
        Self::new(query, Hypothesis::PowerLaw { constant })
    }

    /// Pin a normal hypothesis, fitting the model to the current result.
    pub fn normal(query: QueryRef) -> Result<Self, SafeguardError> {
        let config = Config::default();
        let snapshot = query.snapshot();
        let bins = estimate::binned_masses(&snapshot, &config)?;
        let points: Vec<(f64, f64)> = bins
            .iter()
            .map(|&(low, high, mass)| ((low + high) / 2.0, mass))
            .collect();
        let constant = NormalConstant::fit(&points)?;
        Self::new(query, Hypothesis::Normal { constant })
    }

    /// Pin a linear hypothesis, fitting the model to the current result.
    pub fn linear(query: QueryRef) -> Result<Self, SafeguardError> {
        let config = Config::default();
        let snapshot = query.snapshot();
        let points = estimate::planar_points(&snapshot, &config)?;
        let constant = LinearRegressionConstant::fit(&points)?;
        Self::new(query, Hypothesis::Linear { constant })
    }

    /// Replace the evaluation limits.
    ///
    /// A model fitted at pin time is unaffected; call
    /// [`update_constant`](Self::update_constant) to refit under the new
    /// limits.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Score the hypothesis against the query's current snapshot.
    ///
    /// Pure: nothing is recorded. Use [`update`](Self::update) to also
    /// append to the history.
    pub fn validity(&self) -> Result<Validity, SafeguardError> {
        let snapshot = self.query.snapshot();
        self.validity_on(&snapshot)
    }

    /// Score the hypothesis and record the outcome in the history.
    ///
    /// A failed evaluation records nothing; the hypothesis is simply
    /// retried on a later, richer result.
    pub fn update(&mut self) -> Result<Validity, SafeguardError> {
        let snapshot = self.query.snapshot();
        let validity = self.validity_on(&snapshot)?;

        self.history.push(ValidityRecord::now(validity));
        self.last_updated_at = SystemTime::now();
        debug!(
            safeguard = %self.safeguard_type(),
            hypothesis = %self.hypothesis,
            progress = snapshot.progress(),
            %validity,
            "validity updated"
        );
        Ok(validity)
    }

    /// Refit a distributive model to the current result.
    ///
    /// The fitted constant is replaced by value; earlier history entries
    /// keep the scores they were computed with. On the threshold types
    /// this is a no-op, so callers can refresh a mixed set of safeguards
    /// uniformly.
    pub fn update_constant(&mut self) -> Result<(), SafeguardError> {
        let snapshot = self.query.snapshot();
        let refitted = match &self.hypothesis {
            Hypothesis::PowerLaw { .. } => {
                let series = estimate::power_law_series(&snapshot, &self.config)?;
                Hypothesis::PowerLaw {
                    constant: PowerLawConstant::fit(&series)?,
                }
            }
            Hypothesis::Normal { .. } => {
                let bins = estimate::binned_masses(&snapshot, &self.config)?;
                let points: Vec<(f64, f64)> = bins
                    .iter()
                    .map(|&(low, high, mass)| ((low + high) / 2.0, mass))
                    .collect();
                Hypothesis::Normal {
                    constant: NormalConstant::fit(&points)?,
                }
            }
            Hypothesis::Linear { .. } => {
                let points = estimate::planar_points(&snapshot, &self.config)?;
                Hypothesis::Linear {
                    constant: LinearRegressionConstant::fit(&points)?,
                }
            }
            _ => return Ok(()),
        };

        debug!(
            safeguard = %self.safeguard_type(),
            hypothesis = %refitted,
            progress = snapshot.progress(),
            "constant refitted"
        );
        self.hypothesis = refitted;
        Ok(())
    }

    /// A structured, serializable snapshot for audit logs.
    pub fn to_log(&self) -> SafeguardLog {
        let snapshot = self.query.snapshot();
        SafeguardLog {
            safeguard_type: self.safeguard_type(),
            description: self.hypothesis.to_string(),
            variable: self.variable_log(),
            operator: self.operator(),
            constant: self.constant_log(),
            query: QuerySummary::of(self.query.as_ref(), &snapshot),
            validity: self.validity_on(&snapshot).ok(),
            created_at_ms: epoch_millis(self.created_at),
            last_updated_at_ms: epoch_millis(self.last_updated_at),
            history_len: self.history.len(),
        }
    }

    /// The pinned hypothesis.
    pub fn hypothesis(&self) -> &Hypothesis {
        &self.hypothesis
    }

    /// The safeguard type.
    pub fn safeguard_type(&self) -> SafeguardType {
        self.hypothesis.safeguard_type()
    }

    /// The score family this safeguard reports.
    pub fn validity_kind(&self) -> ValidityKind {
        self.safeguard_type().validity_kind()
    }

    /// The asserted relation, including the implicit ones: `InRange` for
    /// range hypotheses and `Follow` for distributive ones.
    pub fn operator(&self) -> Operator {
        match &self.hypothesis {
            Hypothesis::Value { operator, .. }
            | Hypothesis::Rank { operator, .. }
            | Hypothesis::Comparative { operator, .. } => *operator,
            Hypothesis::Range { .. } => Operator::InRange,
            Hypothesis::PowerLaw { .. } | Hypothesis::Normal { .. } | Hypothesis::Linear { .. } => {
                Operator::Follow
            }
        }
    }

    /// All recorded evaluations, oldest first.
    pub fn history(&self) -> &[ValidityRecord] {
        &self.history
    }

    /// When the hypothesis was pinned.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// When the history last grew.
    pub fn last_updated_at(&self) -> SystemTime {
        self.last_updated_at
    }

    /// The evaluation limits in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn validity_on(&self, snapshot: &ResultSnapshot) -> Result<Validity, SafeguardError> {
        let estimatable = self.query.estimatable();
        match &self.hypothesis {
            Hypothesis::Value {
                variable,
                operator,
                constant,
            } => {
                if estimatable {
                    estimate::value_p(snapshot, variable, *operator, constant)
                } else {
                    estimate::value_bound(snapshot, variable, *operator, constant)
                }
            }
            Hypothesis::Rank {
                variable,
                operator,
                constant,
            } => {
                if estimatable {
                    estimate::rank_p(snapshot, variable, *operator, constant, &self.config)
                } else {
                    estimate::rank_bound(snapshot, variable, *operator, constant)
                }
            }
            Hypothesis::Range { variable, constant } => {
                if estimatable {
                    estimate::range_p(snapshot, variable, constant)
                } else {
                    estimate::range_bound(snapshot, variable, constant)
                }
            }
            Hypothesis::Comparative { pair, operator } => {
                if estimatable {
                    estimate::comparative_p(snapshot, pair, *operator)
                } else {
                    estimate::comparative_bound(snapshot, pair, *operator)
                }
            }
            Hypothesis::PowerLaw { constant } => {
                estimate::power_law_quality(snapshot, constant, &self.config)
            }
            Hypothesis::Normal { constant } => {
                estimate::normal_quality(snapshot, constant, &self.config)
            }
            Hypothesis::Linear { constant } => {
                estimate::linear_error(snapshot, constant, &self.config)
            }
        }
    }

    fn variable_log(&self) -> VariableLog {
        match &self.hypothesis {
            Hypothesis::Value { variable, .. }
            | Hypothesis::Rank { variable, .. }
            | Hypothesis::Range { variable, .. } => VariableLog::from(variable),
            Hypothesis::Comparative { pair, .. } => VariableLog::from(pair),
            Hypothesis::PowerLaw { .. } | Hypothesis::Normal { .. } | Hypothesis::Linear { .. } => {
                VariableLog::from(DistributiveVariable)
            }
        }
    }

    fn constant_log(&self) -> Option<ConstantLog> {
        match &self.hypothesis {
            Hypothesis::Value { constant, .. } => Some(ConstantLog::from(constant)),
            Hypothesis::Rank { constant, .. } => Some(ConstantLog::from(constant)),
            Hypothesis::Range { constant, .. } => Some(ConstantLog::from(constant)),
            Hypothesis::Comparative { .. } => None,
            Hypothesis::PowerLaw { constant } => Some(ConstantLog::from(constant)),
            Hypothesis::Normal { constant } => Some(ConstantLog::from(constant)),
            Hypothesis::Linear { constant } => Some(ConstantLog::from(constant)),
        }
    }
}

impl fmt::Debug for Safeguard {
    // The query handle is a trait object; summarize instead of printing it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Safeguard")
            .field("hypothesis", &self.hypothesis)
            .field("config", &self.config)
            .field("created_at", &self.created_at)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// A structured snapshot of a safeguard for audit and analytics logs.
#[derive(Debug, Clone, Serialize)]
pub struct SafeguardLog {
    /// The safeguard type.
    #[serde(rename = "type")]
    pub safeguard_type: SafeguardType,
    /// Human-readable hypothesis.
    pub description: String,
    /// The hypothesis subject.
    pub variable: VariableLog,
    /// The asserted relation.
    pub operator: Operator,
    /// The hypothesis target, absent for comparative hypotheses.
    pub constant: Option<ConstantLog>,
    /// The query at logging time.
    pub query: QuerySummary,
    /// The current score, absent when evaluation failed.
    pub validity: Option<Validity>,
    /// Pin time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// Last recorded update, milliseconds since the Unix epoch.
    pub last_updated_at_ms: u64,
    /// Recorded evaluations so far.
    pub history_len: usize,
}

impl SafeguardLog {
    /// Render as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::query::MemoryQuery;
    use crate::types::{AxisScale, ConfidenceEstimate, GroupKey, KeyPart, ResultRow};

    fn category_rows(groups: &[(&str, f64, f64)]) -> Vec<ResultRow> {
        groups
            .iter()
            .map(|&(name, center, stdev)| {
                ResultRow::new(GroupKey::from(name), ConfidenceEstimate::ci3(center, stdev))
            })
            .collect()
    }

    fn category_query(groups: &[(&str, f64, f64)], estimatable: bool) -> QueryRef {
        let query = MemoryQuery::new(vec![AxisScale::Categorical]).with_estimatable(estimatable);
        query.replace(category_rows(groups), 0.5);
        Arc::new(query)
    }

    fn p_of(validity: Validity) -> f64 {
        match validity {
            Validity::PValue(p) => p,
            other => panic!("expected a p-value, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_follows_the_capability_flag() {
        let groups = [("A", 10.0, 1.0)];
        let variable = SingleVariable::new(GroupKey::from("A"));
        let constant = ValueConstant::new(9.0);

        let probabilistic = Safeguard::value(
            category_query(&groups, true),
            variable.clone(),
            Operator::GreaterThan,
            constant,
        )
        .unwrap();
        let bound_only = Safeguard::value(
            category_query(&groups, false),
            variable,
            Operator::GreaterThan,
            constant,
        )
        .unwrap();

        // P(X <= 9) for X ~ N(10, 1) is about 0.159; the interval [7, 13]
        // straddles 9, so the bound path can only say "undecided".
        let p = p_of(probabilistic.validity().unwrap());
        assert!((p - 0.1587).abs() < 1e-3);
        assert_eq!(p_of(bound_only.validity().unwrap()), 0.5);
    }

    #[test]
    fn malformed_operators_fail_at_pin_time() {
        let query = category_query(&[("A", 10.0, 1.0)], true);
        let err = Safeguard::value(
            query,
            SingleVariable::new(GroupKey::from("A")),
            Operator::InRange,
            ValueConstant::new(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, SafeguardError::InvalidHypothesis(_)));
    }

    #[test]
    fn rank_comparative_needs_the_bound_path() {
        let groups = [("A", 10.0, 1.0), ("B", 20.0, 1.0)];
        let pair = VariablePair::rank_based(
            SingleVariable::new(GroupKey::from("A")),
            SingleVariable::new(GroupKey::from("B")),
        );

        // On a distributional query the probabilistic path is selected and
        // must refuse rank pairs instead of silently switching.
        let on_estimatable =
            Safeguard::comparative(category_query(&groups, true), pair.clone(), Operator::LessThan)
                .unwrap();
        assert!(matches!(
            on_estimatable.validity().unwrap_err(),
            SafeguardError::InvalidHypothesis(_)
        ));

        // A's value is certainly below B's, so A certainly ranks below B.
        let on_bounds =
            Safeguard::comparative(category_query(&groups, false), pair, Operator::GreaterThan)
                .unwrap();
        assert_eq!(p_of(on_bounds.validity().unwrap()), 0.0);
    }

    #[test]
    fn update_appends_history_once_per_success() {
        let query = category_query(&[("A", 10.0, 1.0)], true);
        let mut safeguard = Safeguard::value(
            query,
            SingleVariable::new(GroupKey::from("A")),
            Operator::GreaterThan,
            ValueConstant::new(9.0),
        )
        .unwrap();

        assert!(safeguard.validity().is_ok());
        assert_eq!(safeguard.history().len(), 0);

        safeguard.update().unwrap();
        safeguard.update().unwrap();
        assert_eq!(safeguard.history().len(), 2);
        assert!(safeguard.history()[0].at <= safeguard.history()[1].at);
    }

    #[test]
    fn failed_updates_record_nothing() {
        let query = category_query(&[("A", 10.0, 1.0)], true);
        let mut safeguard = Safeguard::value(
            query,
            SingleVariable::new(GroupKey::from("gone")),
            Operator::GreaterThan,
            ValueConstant::new(9.0),
        )
        .unwrap();

        assert!(matches!(
            safeguard.update().unwrap_err(),
            SafeguardError::StaleReference { .. }
        ));
        assert!(safeguard.history().is_empty());
    }

    #[test]
    fn stale_groups_resolve_after_a_refresh() {
        let query = Arc::new(MemoryQuery::new(vec![AxisScale::Categorical]));
        query.replace(category_rows(&[("A", 10.0, 1.0)]), 0.2);

        let mut safeguard = Safeguard::value(
            Arc::clone(&query) as QueryRef,
            SingleVariable::new(GroupKey::from("B")),
            Operator::GreaterThan,
            ValueConstant::new(9.0),
        )
        .unwrap();
        assert!(safeguard.update().is_err());

        query.replace(category_rows(&[("A", 10.0, 1.0), ("B", 14.0, 0.5)]), 0.4);
        assert!(safeguard.update().is_ok());
        assert_eq!(safeguard.history().len(), 1);
    }

    #[test]
    fn distributive_pins_fit_from_the_current_result() {
        let centers: Vec<(String, f64)> = (1..=16)
            .map(|r| (format!("g{r}"), 400.0 * (r as f64).powf(-1.1)))
            .collect();
        let groups: Vec<(&str, f64, f64)> = centers
            .iter()
            .map(|(name, center)| (name.as_str(), *center, center / 20.0))
            .collect();
        let query = category_query(&groups, true);

        let safeguard = Safeguard::power_law(query).unwrap();
        match safeguard.hypothesis() {
            Hypothesis::PowerLaw { constant } => {
                assert!((constant.exponent - (-1.1)).abs() < 0.01);
            }
            other => panic!("expected a power-law hypothesis, got {other:?}"),
        }
        match safeguard.validity().unwrap() {
            Validity::Quality(q) => assert!(q > 0.99),
            other => panic!("expected quality, got {other:?}"),
        }
    }

    #[test]
    fn distributive_pins_fail_on_an_empty_result() {
        let query: QueryRef = Arc::new(MemoryQuery::new(vec![AxisScale::Categorical]));
        let err = Safeguard::power_law(query).unwrap_err();
        assert!(matches!(err, SafeguardError::InsufficientData { .. }));
    }

    #[test]
    fn update_constant_refits_distributive_models_only() {
        let query = Arc::new(MemoryQuery::new(vec![AxisScale::binned(0.0, 1.0)]));
        let line_rows = |slope: f64| -> Vec<ResultRow> {
            (0..10)
                .map(|i| {
                    ResultRow::new(
                        GroupKey::single(KeyPart::Bin(i)),
                        ConfidenceEstimate::exact(slope * (0.5 + i as f64)),
                    )
                })
                .collect()
        };
        query.replace(line_rows(2.0), 0.3);

        let mut linear = Safeguard::linear(Arc::clone(&query) as QueryRef).unwrap();
        let before = match *linear.hypothesis() {
            Hypothesis::Linear { constant } => constant,
            _ => unreachable!(),
        };
        assert!((before.slope - 2.0).abs() < 1e-9);

        // The trend steepens; the old model no longer fits until refitted.
        query.replace(line_rows(5.0), 0.8);
        match linear.validity().unwrap() {
            Validity::Error(e) => assert!(e > 1.0),
            other => panic!("expected error, got {other:?}"),
        }

        linear.update_constant().unwrap();
        match *linear.hypothesis() {
            Hypothesis::Linear { constant } => assert!((constant.slope - 5.0).abs() < 1e-9),
            _ => unreachable!(),
        }
        match linear.validity().unwrap() {
            Validity::Error(e) => assert!(e < 1e-9),
            other => panic!("expected error, got {other:?}"),
        }

        // No-op on threshold types: same hypothesis, Ok result.
        let value_query = category_query(&[("A", 10.0, 1.0)], true);
        let mut value = Safeguard::value(
            value_query,
            SingleVariable::new(GroupKey::from("A")),
            Operator::GreaterThan,
            ValueConstant::new(9.0),
        )
        .unwrap();
        let hypothesis = value.hypothesis().clone();
        value.update_constant().unwrap();
        assert_eq!(*value.hypothesis(), hypothesis);
    }

    #[test]
    fn implicit_operators_fill_the_log() {
        let query = category_query(&[("A", 10.0, 1.0)], true);
        let range = Safeguard::range(
            Arc::clone(&query),
            SingleVariable::new(GroupKey::from("A")),
            RangeConstant::span(8.0, 12.0),
        )
        .unwrap();
        assert_eq!(range.operator(), Operator::InRange);
        assert_eq!(range.validity_kind(), ValidityKind::PValue);
        assert!(!range.safeguard_type().is_distributive());
    }

    #[test]
    fn log_snapshot_is_structured() {
        let query = category_query(&[("A", 10.0, 1.0)], true);
        let mut safeguard = Safeguard::value(
            query,
            SingleVariable::new(GroupKey::from("A")),
            Operator::GreaterThan,
            ValueConstant::new(9.0),
        )
        .unwrap();
        safeguard.update().unwrap();

        let log = safeguard.to_log();
        let json = log.to_json();

        assert_eq!(json["type"], "value");
        assert_eq!(json["operator"], "greater_than");
        assert_eq!(json["variable"]["kind"], "single");
        assert_eq!(json["constant"]["kind"], "value");
        assert_eq!(json["query"]["estimatable"], true);
        assert_eq!(json["validity"]["kind"], "p_value");
        assert_eq!(json["history_len"], 1);
        assert!(json["created_at_ms"].as_u64().unwrap() > 0);
    }

    #[test]
    fn failed_evaluations_log_without_a_score() {
        let query = category_query(&[("A", 10.0, 1.0)], true);
        let safeguard = Safeguard::value(
            query,
            SingleVariable::new(GroupKey::from("gone")),
            Operator::GreaterThan,
            ValueConstant::new(9.0),
        )
        .unwrap();

        let json = safeguard.to_log().to_json();
        assert!(json["validity"].is_null());
        assert_eq!(json["history_len"], 0);
    }
}
