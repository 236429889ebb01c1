//! The seam between safeguards and the progressive query engine.
//!
//! Safeguards never talk to the sampler directly. They hold a handle to
//! something that can produce a [`ResultSnapshot`]: an immutable, internally
//! consistent view of every group's estimate at one moment of the ongoing
//! computation. All reads within one evaluation come from one snapshot, so a
//! refresh landing mid-evaluation can never mix old and new estimates.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::types::{AxisScale, ConfidenceEstimate, GroupKey, KeyPart, ResultRow};

/// Shared handle to a progressive aggregate query.
pub type QueryRef = Arc<dyn AggregateQuery + Send + Sync>;

/// A progressively computed aggregate query, as seen by safeguards.
pub trait AggregateQuery {
    /// Whether the query's approximator models uncertainty as a
    /// distribution. When false, estimates only provide hard bounds and
    /// safeguards fall back to interval reasoning.
    fn estimatable(&self) -> bool;

    /// Whether the aggregate is non-negative by construction (counts,
    /// sums of non-negative measures).
    fn always_non_negative(&self) -> bool;

    /// A consistent view of the current partial result.
    fn snapshot(&self) -> ResultSnapshot;
}

/// An immutable view of a query's partial result at one instant.
#[derive(Debug, Clone)]
pub struct ResultSnapshot {
    axes: Vec<AxisScale>,
    rows: Vec<ResultRow>,
    progress: f64,
    index: HashMap<GroupKey, usize>,
}

impl ResultSnapshot {
    /// Build a snapshot from grouping axes, result rows, and the fraction
    /// of input processed so far.
    ///
    /// # Panics
    ///
    /// Panics when `progress` is outside `[0, 1]` or a group key appears
    /// twice.
    pub fn new(axes: Vec<AxisScale>, rows: Vec<ResultRow>, progress: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&progress),
            "progress must lie in [0, 1]"
        );

        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let previous = index.insert(row.key.clone(), i);
            assert!(previous.is_none(), "duplicate group key: {}", row.key);
        }

        Self {
            axes,
            rows,
            progress,
            index,
        }
    }

    /// The grouping axes, one scale per key part.
    pub fn axes(&self) -> &[AxisScale] {
        &self.axes
    }

    /// All result rows, in the order the query engine emitted them.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of groups in the result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result has no groups yet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fraction of the input processed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Look up a group's row.
    pub fn row(&self, key: &GroupKey) -> Option<&ResultRow> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    /// Look up a group's current estimate.
    pub fn estimate(&self, key: &GroupKey) -> Option<&ConfidenceEstimate> {
        self.row(key).map(|row| &row.estimate)
    }

    /// Index of the first binned grouping axis, if any.
    pub fn first_binned_axis(&self) -> Option<usize> {
        self.axes.iter().position(AxisScale::is_binned)
    }

    /// Numeric bounds of `key`'s bin on grouping axis `axis`.
    ///
    /// `None` when the axis is not binned or the key part there is not a
    /// bin.
    pub fn axis_bounds(&self, axis: usize, key: &GroupKey) -> Option<(f64, f64)> {
        let scale = self.axes.get(axis)?;
        match key.parts().get(axis)? {
            KeyPart::Bin(i) => scale.bin_bounds(*i),
            _ => None,
        }
    }

    /// Numeric midpoint of `key`'s bin on grouping axis `axis`.
    pub fn axis_midpoint(&self, axis: usize, key: &GroupKey) -> Option<f64> {
        self.axis_bounds(axis, key).map(|(lo, hi)| (lo + hi) / 2.0)
    }
}

/// Compact description of a query for structured logs.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySummary {
    /// Whether the approximator is distributional.
    pub estimatable: bool,
    /// Whether the aggregate is non-negative by construction.
    pub always_non_negative: bool,
    /// Group count at the time of the summary.
    pub groups: usize,
    /// Fraction of the input processed.
    pub progress: f64,
}

impl QuerySummary {
    /// Summarize a query and one of its snapshots.
    pub fn of(query: &dyn AggregateQuery, snapshot: &ResultSnapshot) -> Self {
        Self {
            estimatable: query.estimatable(),
            always_non_negative: query.always_non_negative(),
            groups: snapshot.len(),
            progress: snapshot.progress(),
        }
    }
}

/// An in-memory [`AggregateQuery`] fed by an external sampling loop.
///
/// The sampler calls [`replace`](MemoryQuery::replace) whenever a pass
/// completes; readers get whichever snapshot was current when they asked.
#[derive(Debug)]
pub struct MemoryQuery {
    estimatable: bool,
    always_non_negative: bool,
    current: RwLock<ResultSnapshot>,
}

impl MemoryQuery {
    /// Create an empty query over the given grouping axes.
    ///
    /// Defaults to an estimatable, sign-unconstrained aggregate.
    pub fn new(axes: Vec<AxisScale>) -> Self {
        let empty = ResultSnapshot::new(axes, Vec::new(), 0.0);
        Self {
            estimatable: true,
            always_non_negative: false,
            current: RwLock::new(empty),
        }
    }

    /// Set whether the approximator is distributional.
    #[must_use]
    pub fn with_estimatable(mut self, estimatable: bool) -> Self {
        self.estimatable = estimatable;
        self
    }

    /// Declare the aggregate non-negative by construction.
    #[must_use]
    pub fn with_always_non_negative(mut self, non_negative: bool) -> Self {
        self.always_non_negative = non_negative;
        self
    }

    /// Publish a fresh result, replacing the previous snapshot whole.
    pub fn replace(&self, rows: Vec<ResultRow>, progress: f64) {
        let axes = {
            let current = self
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            current.axes().to_vec()
        };
        let next = ResultSnapshot::new(axes, rows, progress);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = next;
    }
}

impl AggregateQuery for MemoryQuery {
    fn estimatable(&self) -> bool {
        self.estimatable
    }

    fn always_non_negative(&self) -> bool {
        self.always_non_negative
    }

    fn snapshot(&self) -> ResultSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_rows(pairs: &[(&str, f64, f64)]) -> Vec<ResultRow> {
        pairs
            .iter()
            .map(|&(name, center, stdev)| {
                ResultRow::new(GroupKey::from(name), ConfidenceEstimate::ci3(center, stdev))
            })
            .collect()
    }

    #[test]
    fn snapshot_indexes_groups() {
        let rows = category_rows(&[("A", 1.0, 0.5), ("B", 2.0, 0.5)]);
        let snapshot = ResultSnapshot::new(vec![AxisScale::Categorical], rows, 0.25);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.estimate(&GroupKey::from("B")).unwrap().center, 2.0);
        assert!(snapshot.estimate(&GroupKey::from("C")).is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate group key")]
    fn duplicate_keys_panic() {
        let rows = category_rows(&[("A", 1.0, 0.5), ("A", 2.0, 0.5)]);
        ResultSnapshot::new(vec![AxisScale::Categorical], rows, 0.0);
    }

    #[test]
    #[should_panic(expected = "progress must lie in [0, 1]")]
    fn out_of_range_progress_panics() {
        ResultSnapshot::new(vec![AxisScale::Categorical], Vec::new(), 1.5);
    }

    #[test]
    fn axis_lookups_follow_the_scale() {
        let rows = vec![ResultRow::new(
            GroupKey::single(KeyPart::Bin(2)),
            ConfidenceEstimate::exact(4.0),
        )];
        let snapshot = ResultSnapshot::new(vec![AxisScale::binned(10.0, 5.0)], rows, 1.0);
        let key = GroupKey::single(KeyPart::Bin(2));

        assert_eq!(snapshot.first_binned_axis(), Some(0));
        assert_eq!(snapshot.axis_bounds(0, &key), Some((20.0, 25.0)));
        assert_eq!(snapshot.axis_midpoint(0, &key), Some(22.5));
        assert_eq!(snapshot.axis_bounds(1, &key), None);
    }

    #[test]
    fn null_parts_have_no_position() {
        let rows = vec![ResultRow::new(
            GroupKey::single(KeyPart::Null),
            ConfidenceEstimate::exact(1.0),
        )];
        let snapshot = ResultSnapshot::new(vec![AxisScale::binned(0.0, 1.0)], rows, 1.0);

        assert_eq!(snapshot.axis_midpoint(0, &GroupKey::single(KeyPart::Null)), None);
    }

    #[test]
    fn memory_query_swaps_snapshots_whole() {
        let query = MemoryQuery::new(vec![AxisScale::Categorical]);
        assert!(query.snapshot().is_empty());

        query.replace(category_rows(&[("A", 1.0, 0.2)]), 0.5);
        let before = query.snapshot();

        query.replace(category_rows(&[("A", 1.5, 0.1), ("B", 3.0, 0.4)]), 0.75);
        let after = query.snapshot();

        // The earlier snapshot is frozen even after the swap.
        assert_eq!(before.len(), 1);
        assert_eq!(before.progress(), 0.5);
        assert_eq!(after.len(), 2);
        assert_eq!(after.progress(), 0.75);
    }

    #[test]
    fn memory_query_flags_are_settable() {
        let query = MemoryQuery::new(vec![AxisScale::Categorical])
            .with_estimatable(false)
            .with_always_non_negative(true);
        assert!(!query.estimatable());
        assert!(query.always_non_negative());
    }

    #[test]
    fn summary_reflects_query_state() {
        let query = MemoryQuery::new(vec![AxisScale::Categorical]).with_estimatable(false);
        query.replace(category_rows(&[("A", 1.0, 0.0)]), 1.0);

        let snapshot = query.snapshot();
        let summary = QuerySummary::of(&query, &snapshot);
        assert!(!summary.estimatable);
        assert_eq!(summary.groups, 1);
        assert_eq!(summary.progress, 1.0);
    }
}
