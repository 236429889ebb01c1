//! # vigil
//!
//! Score pinned hypotheses against progressive query results.
//!
//! Progressive aggregation engines return partial results long before a
//! scan completes, and every partial value carries a confidence interval.
//! An analyst who spots a pattern in a preview can pin it as a safeguard;
//! the safeguard is then rescored on demand as the result refines, yielding:
//! - p-values for value, rank, range and comparative hypotheses
//! - quality scores (0.0-1.0) for power-law and normal shape hypotheses
//! - error magnitudes for linear trend hypotheses
//!
//! Queries whose approximator is distributional ([`AggregateQuery::estimatable`])
//! get exact tail probabilities under a per-group normal belief; queries
//! that only carry hard interval bounds get three-way verdicts (holds,
//! violated, undecided) mapped onto the same p-value scale.
//!
//! ## Scoring vs. Recording
//!
//! [`Safeguard::validity`] scores the hypothesis against the query's
//! current snapshot and leaves the safeguard untouched, so it is safe to
//! call from render loops. [`Safeguard::update`] does the same scoring but
//! appends the outcome to the safeguard's history and stamps the time;
//! call it once per completed sampling pass.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vigil::{
//!     AxisScale, ConfidenceEstimate, GroupKey, MemoryQuery, Operator, ResultRow, Safeguard,
//!     SingleVariable, Validity, ValueConstant,
//! };
//!
//! // A categorical aggregate, 30% of the way through its input.
//! let query = Arc::new(MemoryQuery::new(vec![AxisScale::Categorical]));
//! query.replace(
//!     vec![
//!         ResultRow::new(GroupKey::from("adelie"), ConfidenceEstimate::ci3(10.0, 1.0)),
//!         ResultRow::new(GroupKey::from("gentoo"), ConfidenceEstimate::ci3(14.0, 0.8)),
//!     ],
//!     0.3,
//! );
//!
//! // Pin "adelie stays below 12" and score it against the preview.
//! let mut safeguard = Safeguard::value(
//!     query.clone(),
//!     SingleVariable::new(GroupKey::from("adelie")),
//!     Operator::LessThan,
//!     ValueConstant::new(12.0),
//! )?;
//!
//! match safeguard.update()? {
//!     Validity::PValue(p) => assert!(p < 0.05),
//!     other => panic!("expected a p-value, got {other}"),
//! }
//! # Ok::<(), vigil::SafeguardError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod error;
mod query;
mod types;

// Functional modules
pub mod estimate;
pub mod safeguard;
pub mod statistics;

// Re-exports for public API
pub use config::Config;
pub use error::SafeguardError;
pub use query::{AggregateQuery, MemoryQuery, QueryRef, QuerySummary, ResultSnapshot};
pub use safeguard::constant::{
    ConstantLog, LinearRegressionConstant, NormalConstant, PowerLawConstant, RangeConstant,
    RankConstant, ValueConstant,
};
pub use safeguard::operator::Operator;
pub use safeguard::validity::{Validity, ValidityKind, ValidityRecord};
pub use safeguard::variable::{DistributiveVariable, SingleVariable, VariableLog, VariablePair};
pub use safeguard::{Hypothesis, Safeguard, SafeguardLog, SafeguardType};
pub use types::{AxisScale, ConfidenceEstimate, GroupKey, KeyPart, ResultRow};
