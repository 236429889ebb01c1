//! Error types for safeguard construction and evaluation.

use crate::types::GroupKey;

/// Why a safeguard could not be created or scored.
///
/// Evaluation errors are recoverable: the result keeps refreshing, so a
/// failing safeguard is retried on the next pass rather than torn down.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SafeguardError {
    /// The hypothesis is malformed for its safeguard type, e.g. an ordering
    /// operator where only a comparison makes sense.
    #[error("invalid hypothesis: {0}")]
    InvalidHypothesis(String),

    /// The current result does not carry enough usable groups to evaluate
    /// or fit against.
    #[error("insufficient data: needed {needed} usable groups, had {actual}")]
    InsufficientData {
        /// Minimum usable group count for the operation.
        needed: usize,
        /// Usable groups actually present.
        actual: usize,
    },

    /// The hypothesis names a group that is no longer present in the
    /// result, e.g. after the user changed a filter.
    #[error("group \"{key}\" is no longer present in the result")]
    StaleReference {
        /// The missing group.
        key: GroupKey,
    },
}
