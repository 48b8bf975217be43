//! Comparison of a reconciled series with a ground-truth series.

use crate::model::SnapshotSeries;
use chrono::NaiveDateTime;

/// Agreement of one time point with the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePointComparison {
    pub time: NaiveDateTime,
    /// Roots in the reference snapshot
    pub total: usize,
    /// Reference identifiers absent from the reconciled snapshot
    pub missing: usize,
    /// Identifiers present in both, but with different labels
    pub mislabeled: usize,
    /// Identifiers present in both, but attached to a different shape
    pub misassigned: usize,
}

impl TimePointComparison {
    /// Whether every reference root was found unchanged.
    pub fn is_exact(&self) -> bool {
        self.missing == 0 && self.mislabeled == 0 && self.misassigned == 0
    }
}

/// Compares `result` with `reference`, one entry per reference time point.
///
/// A reference time point absent from `result` counts all its roots as missing.
pub fn compare_with_reference(result: &SnapshotSeries, reference: &SnapshotSeries) -> Vec<TimePointComparison> {
    reference.iter()
        .map(|(&time, expected)| {
            let mut comparison = TimePointComparison {
                time,
                total: expected.num_roots(),
                missing: 0,
                mislabeled: 0,
                misassigned: 0,
            };

            let Some(actual) = result.get(&time) else {
                comparison.missing = comparison.total;
                return comparison;
            };

            for (_, root) in expected.roots() {
                match actual.root_by_id(root.id()) {
                    None => comparison.missing += 1,
                    Some(found) if found.label() != root.label() => comparison.mislabeled += 1,
                    Some(found) if found.geometry() != root.geometry() => comparison.misassigned += 1,
                    Some(_) => {}
                }
            }
            comparison
        })
        .collect()
}
