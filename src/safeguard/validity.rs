//! Validity scores: how believable a hypothesis currently is.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// The score family a safeguard type reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityKind {
    /// Probability that the hypothesis does NOT hold; lower is better.
    PValue,
    /// Goodness of fit in `[0, 1]`; higher is better.
    Quality,
    /// Residual magnitude in the data's units; lower is better.
    Error,
}

impl fmt::Display for ValidityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidityKind::PValue => "p value",
            ValidityKind::Quality => "quality",
            ValidityKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// A validity score.
///
/// The kind is fixed by the safeguard type, so every score a given
/// safeguard ever reports is directly comparable with the previous ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Validity {
    /// Probability that the hypothesis does not hold.
    PValue(f64),
    /// Goodness of fit.
    Quality(f64),
    /// Residual magnitude.
    Error(f64),
}

impl Validity {
    /// The score family.
    pub fn kind(&self) -> ValidityKind {
        match self {
            Validity::PValue(_) => ValidityKind::PValue,
            Validity::Quality(_) => ValidityKind::Quality,
            Validity::Error(_) => ValidityKind::Error,
        }
    }

    /// The raw score.
    pub fn value(&self) -> f64 {
        match *self {
            Validity::PValue(v) | Validity::Quality(v) | Validity::Error(v) => v,
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::PValue(v) => write!(f, "p = {v:.4}"),
            Validity::Quality(v) => write!(f, "quality = {v:.4}"),
            Validity::Error(v) => write!(f, "error = {v:.4}"),
        }
    }
}

/// One evaluation outcome, timestamped for the safeguard's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidityRecord {
    /// The score that was computed.
    pub validity: Validity,
    /// When it was computed.
    pub at: SystemTime,
}

impl ValidityRecord {
    /// Record a score at the current time.
    pub fn now(validity: Validity) -> Self {
        Self {
            validity,
            at: SystemTime::now(),
        }
    }
}
