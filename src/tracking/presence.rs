//! Presence vectors and their continuity classification.

use crate::model::SnapshotSeries;
use std::collections::{BTreeMap, BTreeSet};

/// Continuity class of one identifier's presence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Continuity {
    /// Absent, then present at every later time point
    WellClassified,
    /// Present at some time point, absent at a later one
    Misclassified,
    /// Present only at the final time point
    LastTimeOnly,
}

/// Classifies a presence vector.
///
/// A vector whose only `true` is its final entry is [Continuity::LastTimeOnly];
/// one with a `true` followed anywhere later by a `false` is
/// [Continuity::Misclassified]; everything else is [Continuity::WellClassified].
pub fn classify_presence(presence: &[bool]) -> Continuity {
    match presence.iter().position(|&present| present) {
        Some(first) if first + 1 == presence.len() => Continuity::LastTimeOnly,
        Some(first) if presence[first..].contains(&false) => Continuity::Misclassified,
        _ => Continuity::WellClassified,
    }
}


// =#========================================================================#=
// CLASSIFICATION
// =#========================================================================#=
/// Identifiers grouped by [Continuity].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub well_classified: BTreeSet<String>,
    pub misclassified: BTreeSet<String>,
    pub last_time_only: BTreeSet<String>,
}

impl Classification {
    /// Returns the class of `id`, or `None` if it was never observed.
    pub fn continuity(&self, id: &str) -> Option<Continuity> {
        if self.well_classified.contains(id) {
            Some(Continuity::WellClassified)
        } else if self.misclassified.contains(id) {
            Some(Continuity::Misclassified)
        } else if self.last_time_only.contains(id) {
            Some(Continuity::LastTimeOnly)
        } else {
            None
        }
    }

    /// Number of classified identifiers.
    pub fn len(&self) -> usize {
        self.well_classified.len() + self.misclassified.len() + self.last_time_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


// =#========================================================================#=
// PRESENCE MAP
// =#========================================================================#=
/// Presence vector of every identifier observed in a series, indexed by
/// the position of the time point in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceMap {
    num_time_points: usize,
    vectors: BTreeMap<String, Vec<bool>>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl PresenceMap {
    /// Builds the presence vectors of all identifiers in `series`.
    pub fn from_series(series: &SnapshotSeries) -> Self {
        let mut map = Self { num_time_points: series.len(), vectors: BTreeMap::new() };
        for (time_index, snapshot) in series.values().enumerate() {
            for (_, root) in snapshot.roots() {
                map.mark(root.id(), time_index);
            }
        }
        map
    }

    pub fn num_time_points(&self) -> usize {
        self.num_time_points
    }

    pub fn num_ids(&self) -> usize {
        self.vectors.len()
    }

    pub fn get(&self, id: &str) -> Option<&[bool]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.vectors.keys().map(String::as_str)
    }

    /// Records `id` as present at `time_index`, creating its vector if needed.
    ///
    /// # Panics
    /// Panics if `time_index` is not below [PresenceMap::num_time_points].
    pub fn mark(&mut self, id: &str, time_index: usize) {
        assert!(time_index < self.num_time_points, "time index {time_index} out of range");
        let num_time_points = self.num_time_points;
        self.vectors.entry(id.to_string())
            .or_insert_with(|| vec![false; num_time_points])[time_index] = true;
    }

    /// Records `id` as absent at `time_index`. Unknown identifiers are ignored.
    pub fn unmark(&mut self, id: &str, time_index: usize) {
        if let Some(present) = self.vectors.get_mut(id).and_then(|vector| vector.get_mut(time_index)) {
            *present = false;
        }
    }

    /// Whether `id` appears after `time_index` and stays present from its
    /// first such appearance through the final time point.
    pub fn continues_after(&self, id: &str, time_index: usize) -> bool {
        self.get(id).is_some_and(|vector| {
            let mut later = vector.iter().skip(time_index + 1).skip_while(|&&present| !present).peekable();
            later.peek().is_some() && later.all(|&present| present)
        })
    }

    /// Whether some identifier is missing from both time points following
    /// one where it is present, as happens when identifiers were rewritten
    /// per snapshot. A single missing time point is read as a gap.
    pub fn looks_anonymized(&self) -> bool {
        self.vectors.values()
            .any(|vector| vector.windows(3).any(|window| window[0] && !window[1] && !window[2]))
    }

    /// Classifies every identifier by its current presence vector.
    pub fn classify(&self) -> Classification {
        let mut classification = Classification::default();
        for (id, vector) in &self.vectors {
            let bucket = match classify_presence(vector) {
                Continuity::WellClassified => &mut classification.well_classified,
                Continuity::Misclassified => &mut classification.misclassified,
                Continuity::LastTimeOnly => &mut classification.last_time_only,
            };
            bucket.insert(id.clone());
        }
        classification
    }
}
