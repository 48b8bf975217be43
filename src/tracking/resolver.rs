//! Backward reconciliation of root identifiers over a snapshot series.

use crate::model::{Root, RootRef, Snapshot, SnapshotSeries};
use crate::tracking::cluster::ClusterAssignment;
use crate::tracking::metric::MatchingMetric;
use crate::tracking::presence::{Classification, PresenceMap};
use crate::tracking::TrackingError;
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};


// =#========================================================================#=
// REPORT
// =#========================================================================#=
/// What happened to one root during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Not examined: its identifier already continues through the final time point
    Continuing,
    /// Matched a later root with the same label and took over its identifier
    Matched {
        id: String,
        /// Time point of the matched root
        time: NaiveDateTime,
        distance: f64,
        /// Whether the matched root lies beyond the next time point
        bridged: bool,
    },
    /// The best candidate carries another label
    LabelMismatch { candidate: String },
    /// The best candidate's identifier is held by another root of the same snapshot
    Taken { candidate: String },
    /// No eligible candidate
    NoCandidate,
}

impl MatchOutcome {
    /// Whether the root counts as well-classified.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Continuing | Self::Matched { .. })
    }
}

/// Outcome of one root of a non-final time point.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOutcome {
    pub time: NaiveDateTime,
    pub root: RootRef,
    /// Identifier before reconciliation
    pub original_id: String,
    pub outcome: MatchOutcome,
}

/// Diagnostics of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolutionReport {
    /// Classification of the identifiers as parsed
    pub initial: Classification,
    /// Classification of the identifiers after reconciliation
    pub classification: Classification,
    /// Roots of non-final time points that were skipped or matched
    pub well_classified: usize,
    /// Roots of non-final time points left unresolved
    pub misclassified: usize,
    /// Identifiers still observed at the final time point only
    pub last_time_only: usize,
    /// Roots whose identifier was rewritten
    pub renamed: usize,
    /// Identifiers carried across a time point where they are absent
    pub bridged: BTreeSet<String>,
    /// Whether the parsed identifiers looked rewritten per snapshot, see
    /// [PresenceMap::looks_anonymized]
    pub anonymized: bool,
    pub outcomes: Vec<RootOutcome>,
}


// =#========================================================================#=
// IDENTITY RESOLVER
// =#========================================================================#=
/// Rewrites root identifiers so one physical root keeps one identifier
/// across the time points where it is present.
///
/// Time points are processed backward, from the second-to-last to the
/// first. A root whose identifier continues through the final time point
/// from its next appearance on is skipped. Any other root is compared with
/// the same-order roots of the next time point using the configured
/// [MatchingMetric]. With gap bridging, roots of later time points whose
/// identifier is absent at the next one are candidates as well. A
/// candidate is eligible only if its identifier continues from there on.
/// If the closest candidate carries the same label and its identifier is
/// not held by another root of the snapshot, the root takes it over;
/// otherwise the root stays misclassified.
///
/// A second run over a reconciled series changes nothing.
///
/// With [MatchingMetric::Cluster], the candidate is instead the member of
/// the root's cluster at the nearest later time point.
///
/// # Example
/// ```no_run
/// use rsmltrack::tracking::{IdentityResolver, MatchingMetric};
/// # let mut series = rsmltrack::model::SnapshotSeries::new();
///
/// let report = IdentityResolver::new()
///     .with_metric(MatchingMetric::SHAPE_AND_INSERTION)
///     .reconcile(&mut series)?;
/// println!("{} well, {} misclassified", report.well_classified, report.misclassified);
/// # Ok::<(), rsmltrack::tracking::TrackingError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentityResolver {
    metric: MatchingMetric,
    gap_bridging: bool,
    parallel_matching: bool,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self { metric: MatchingMetric::default(), gap_bridging: true, parallel_matching: true }
    }
}

/// A root of a later time point a root may be matched with.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    time_index: usize,
    root: &'a Root,
    bridged: bool,
}

/// State threaded through the backward pass.
struct Pass<'t> {
    times: &'t [NaiveDateTime],
    presence: PresenceMap,
    clusters: Option<ClusterAssignment>,
    report: ResolutionReport,
}

// ============================================================================
// Configuration (pub)
// ============================================================================
impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metric roots are matched with (default: DTW).
    pub fn with_metric(mut self, metric: MatchingMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Sets whether roots may match across time points where the
    /// candidate's identifier is absent (default: on).
    pub fn with_gap_bridging(mut self, bridging: bool) -> Self {
        self.gap_bridging = bridging;
        self
    }

    /// Sets whether candidate distances are computed in parallel (default: on).
    pub fn with_parallel_matching(mut self, parallel: bool) -> Self {
        self.parallel_matching = parallel;
        self
    }

    pub fn metric(&self) -> MatchingMetric {
        self.metric
    }
}

// ============================================================================
// Reconciliation (pub)
// ============================================================================
impl IdentityResolver {
    /// Reconciles the identifiers of `series` in place.
    ///
    /// # Errors
    /// Returns [TrackingError::TooFewTimePoints] if `series` holds fewer
    /// than two time points. Unresolved roots are reported, never raised.
    pub fn reconcile(&self, series: &mut SnapshotSeries) -> Result<ResolutionReport, TrackingError> {
        if series.len() < 2 {
            return Err(TrackingError::TooFewTimePoints(series.len()));
        }

        let times: Vec<NaiveDateTime> = series.keys().copied().collect();
        let presence = PresenceMap::from_series(series);
        let initial = presence.classify();
        let anonymized = presence.looks_anonymized();
        debug!(
            ids = presence.num_ids(),
            well = initial.well_classified.len(),
            misclassified = initial.misclassified.len(),
            last_time = initial.last_time_only.len(),
            anonymized,
            "initial classification"
        );

        let mut snapshots: Vec<&mut Snapshot> = series.values_mut().collect();
        let clusters = match self.metric {
            MatchingMetric::Cluster { centroid_weight, shape_weight } => {
                let view: Vec<&Snapshot> = snapshots.iter().map(|snapshot| &**snapshot).collect();
                let clusters = ClusterAssignment::build(&view, centroid_weight, shape_weight);
                debug!(clusters = clusters.num_clusters(), "clustered roots of final time point");
                Some(clusters)
            }
            _ => None,
        };

        let mut pass = Pass {
            times: &times,
            presence,
            clusters,
            report: ResolutionReport { initial, anonymized, ..ResolutionReport::default() },
        };

        for time_index in (0..times.len() - 1).rev() {
            let (head, tail) = snapshots.split_at_mut(time_index + 1);
            let later: Vec<&Snapshot> = tail.iter().map(|snapshot| &**snapshot).collect();
            self.reconcile_step(&mut pass, time_index, &mut *head[time_index], &later);
        }

        let mut report = pass.report;
        report.classification = PresenceMap::from_series(series).classify();
        report.last_time_only = report.classification.last_time_only.len();
        info!(
            well = report.well_classified,
            misclassified = report.misclassified,
            last_time_only = report.last_time_only,
            renamed = report.renamed,
            metric = %self.metric,
            "reconciled root identifiers"
        );
        Ok(report)
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl IdentityResolver {
    /// Processes every root of time point `time_index`; `later` holds the
    /// snapshots after it in ascending order.
    fn reconcile_step(&self, pass: &mut Pass, time_index: usize, current: &mut Snapshot, later: &[&Snapshot]) {
        let pool = match pass.clusters {
            Some(_) => Vec::new(),
            None => self.candidate_pool(later, time_index + 1),
        };

        let root_refs: Vec<RootRef> = current.roots().map(|(root_ref, _)| root_ref).collect();
        for root_ref in root_refs {
            let root = current.root(root_ref);
            let original_id = root.id().to_string();

            let outcome = if pass.presence.continues_after(&original_id, time_index) {
                MatchOutcome::Continuing
            } else {
                let found = match &pass.clusters {
                    Some(clusters) => self.cluster_candidate(clusters, time_index, root_ref, current, later, &pass.presence),
                    None => self.best_candidate(root, &pool, time_index, &pass.presence),
                };

                match found {
                    Some((candidate, _)) if candidate.root.label() != root.label() => {
                        MatchOutcome::LabelMismatch { candidate: candidate.root.id().to_string() }
                    }
                    Some((candidate, _)) if !is_free(current, root, candidate.root.id()) => {
                        MatchOutcome::Taken { candidate: candidate.root.id().to_string() }
                    }
                    Some((candidate, distance)) => {
                        let id = candidate.root.id().to_string();
                        if id != original_id {
                            current.set_root_id(root_ref, id.clone());
                            pass.presence.unmark(&original_id, time_index);
                            pass.report.renamed += 1;
                        }
                        pass.presence.mark(&id, time_index);
                        if candidate.bridged {
                            pass.report.bridged.insert(id.clone());
                        }
                        MatchOutcome::Matched {
                            id,
                            time: pass.times[candidate.time_index],
                            distance,
                            bridged: candidate.bridged,
                        }
                    }
                    None => MatchOutcome::NoCandidate,
                }
            };

            match &outcome {
                MatchOutcome::Matched { id, distance, .. } => {
                    debug!(time_index, from = %original_id, to = %id, distance, "matched root");
                }
                MatchOutcome::LabelMismatch { candidate } => {
                    debug!(time_index, id = %original_id, %candidate, "closest candidate has another label");
                }
                MatchOutcome::Taken { candidate } => {
                    debug!(time_index, id = %original_id, %candidate, "closest candidate's identifier is taken");
                }
                MatchOutcome::NoCandidate => debug!(time_index, id = %original_id, "no candidate"),
                MatchOutcome::Continuing => {}
            }

            if outcome.is_resolved() {
                pass.report.well_classified += 1;
            } else {
                pass.report.misclassified += 1;
            }
            pass.report.outcomes.push(RootOutcome {
                time: pass.times[time_index],
                root: root_ref,
                original_id,
                outcome,
            });
        }
    }

    /// Roots of the next time point, followed (with gap bridging) by the
    /// nearest later observation of every identifier absent at the next one.
    fn candidate_pool<'a>(&self, later: &[&'a Snapshot], next_index: usize) -> Vec<Candidate<'a>> {
        let next: &'a Snapshot = later[0];
        let mut pool: Vec<Candidate<'a>> = next.roots()
            .map(|(_, root)| Candidate { time_index: next_index, root, bridged: false })
            .collect();

        if self.gap_bridging {
            let mut seen: HashSet<&str> = HashSet::new();
            for (offset, &snapshot) in later.iter().enumerate().skip(1) {
                for (_, root) in snapshot.roots() {
                    if !next.contains_id(root.id()) && seen.insert(root.id()) {
                        pool.push(Candidate { time_index: next_index + offset, root, bridged: true });
                    }
                }
            }
        }

        pool
    }

    /// Closest eligible candidate in `pool`; ties go to the earliest one.
    fn best_candidate<'a>(
        &self,
        root: &Root,
        pool: &[Candidate<'a>],
        time_index: usize,
        presence: &PresenceMap,
    ) -> Option<(Candidate<'a>, f64)> {
        let eligible: Vec<usize> = (0..pool.len())
            .filter(|&index| {
                let candidate = &pool[index];
                candidate.root.order() == root.order() && presence.continues_after(candidate.root.id(), time_index)
            })
            .collect();

        let score = |&index: &usize| (index, self.metric.distance(root, pool[index].root));
        let scored: Vec<(usize, f64)> = if self.parallel_matching {
            eligible.par_iter().map(score).collect()
        } else {
            eligible.iter().map(score).collect()
        };

        scored.into_iter()
            .filter(|(_, distance)| distance.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, distance)| (pool[index], distance))
    }

    fn cluster_candidate<'a>(
        &self,
        clusters: &ClusterAssignment,
        time_index: usize,
        root_ref: RootRef,
        current: &Snapshot,
        later: &[&'a Snapshot],
        presence: &PresenceMap,
    ) -> Option<(Candidate<'a>, f64)> {
        let root = current.root(root_ref);
        let (member_time, member_ref) = clusters.later_member((time_index, root_ref))?;
        let snapshot: &'a Snapshot = later[member_time - time_index - 1];
        let candidate = Candidate {
            time_index: member_time,
            root: snapshot.root(member_ref),
            bridged: member_time > time_index + 1,
        };

        presence.continues_after(candidate.root.id(), time_index)
            .then(|| (candidate, self.metric.distance(root, candidate.root)))
    }
}

/// Whether `root` may take identifier `id` without duplicating it in `current`.
fn is_free(current: &Snapshot, root: &Root, id: &str) -> bool {
    root.id() == id || !current.contains_id(id)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Geometry, Metadata, Plant, Point, Scene};
    use chrono::NaiveDate;

    fn time(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 5, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn snapshot(roots: Vec<(&str, f64)>) -> Snapshot {
        let mut plant = Plant::new("1", "plant");
        for (id, x) in roots {
            let geometry = Geometry::from_points(vec![Point::new(x, 0.0), Point::new(x, 10.0)]);
            plant.add_root(None, Root::new(id, "root", geometry));
        }
        Snapshot::new(Metadata::default(), Scene::new(vec![plant]))
    }

    #[test]
    fn test_too_few_time_points() {
        let mut series = SnapshotSeries::new();
        assert_eq!(IdentityResolver::new().reconcile(&mut series), Err(TrackingError::TooFewTimePoints(0)));
        series.insert(time(1), snapshot(vec![("a", 0.0)]));
        assert_eq!(IdentityResolver::new().reconcile(&mut series), Err(TrackingError::TooFewTimePoints(1)));
    }

    #[test]
    fn test_renamed_root_takes_later_id() {
        let mut series = SnapshotSeries::new();
        series.insert(time(1), snapshot(vec![("x", 0.0), ("b", 40.0)]));
        series.insert(time(2), snapshot(vec![("a", 0.5), ("b", 40.0)]));

        let report = IdentityResolver::new().with_parallel_matching(false).reconcile(&mut series).unwrap();
        assert!(series[&time(1)].contains_id("a"));
        assert!(!series[&time(1)].contains_id("x"));
        assert_eq!(report.renamed, 1);
        assert_eq!(report.well_classified, 2);
        assert_eq!(report.misclassified, 0);
        assert!(report.classification.misclassified.is_empty());
    }

    #[test]
    fn test_identifier_stays_unique() {
        // Both earlier roots are closest to `a`; only the first may take it
        let mut series = SnapshotSeries::new();
        series.insert(time(1), snapshot(vec![("x", 0.0), ("y", 1.0)]));
        series.insert(time(2), snapshot(vec![("a", 0.0)]));

        let report = IdentityResolver::new().reconcile(&mut series).unwrap();
        let first = &series[&time(1)];
        assert!(first.contains_id("a"));
        assert!(first.contains_id("y"));
        assert_eq!(report.misclassified, 1);
        let outcome = report.outcomes.iter().find(|outcome| outcome.original_id == "y").unwrap();
        assert_eq!(outcome.outcome, MatchOutcome::Taken { candidate: "a".to_string() });
    }

    #[test]
    fn test_bridged_rename_is_stable() {
        // `e` has a gap at day 3, `d` one at day 2 once day 1 is renamed
        let mut series = SnapshotSeries::new();
        series.insert(time(1), snapshot(vec![("a", 20.0)]));
        series.insert(time(2), snapshot(vec![("e", 30.0)]));
        series.insert(time(3), snapshot(vec![("d", 0.0)]));
        series.insert(time(4), snapshot(vec![("d", 30.0), ("e", 10.0)]));

        let resolver = IdentityResolver::new().with_parallel_matching(false);
        let first = resolver.reconcile(&mut series).unwrap();
        let once = series.clone();
        assert!(series[&time(1)].contains_id("d"));
        assert!(series[&time(2)].contains_id("e"));
        assert!(series[&time(3)].contains_id("d"));

        let second = resolver.reconcile(&mut series).unwrap();
        assert_eq!(series, once);
        assert_eq!(second.renamed, 0);
        assert_eq!(second.well_classified, first.well_classified);
        assert_eq!(second.misclassified, first.misclassified);
        assert!(second.outcomes.iter().all(|outcome| outcome.outcome == MatchOutcome::Continuing));
    }
}
