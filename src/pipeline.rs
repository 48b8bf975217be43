//! End-to-end run: candidate directory to reconciled snapshot series.

use crate::error::Result;
use crate::model::{Snapshot, SnapshotSeries};
use crate::parser::date::extract_date;
use crate::rsml::RsmlParser;
use crate::selection::{CandidateResolver, DirectoryResolution, DropReason, DroppedTimePoint, SelectedCandidate};
use crate::tracking::{IdentityResolver, ResolutionReport};
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{info, warn};

/// Snapshot series built from one directory, before reconciliation.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: SnapshotSeries,
    /// Keys dropped by selection, parsing or dating, in that order
    pub dropped: Vec<DroppedTimePoint>,
    pub resolution: DirectoryResolution,
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct TrackingRun {
    /// Reconciled series
    pub series: SnapshotSeries,
    pub report: ResolutionReport,
    pub dropped: Vec<DroppedTimePoint>,
    pub resolution: DirectoryResolution,
}

impl TrackingRun {
    /// Dates of the dropped time points that carry one.
    pub fn dropped_dates(&self) -> Vec<NaiveDateTime> {
        self.dropped.iter().filter_map(|dropped| dropped.date).collect()
    }
}


// =#========================================================================#=
// PIPELINE
// =#========================================================================#=
/// Selection, parsing and reconciliation of one candidate directory.
///
/// # Example
/// ```no_run
/// use rsmltrack::pipeline::Pipeline;
/// use rsmltrack::selection::{CandidateResolver, SelectionStrategy};
/// use rsmltrack::tracking::{IdentityResolver, MatchingMetric};
///
/// let run = Pipeline::new(
///         CandidateResolver::for_directory("data/plate_1")?
///             .with_strategy(SelectionStrategy::MostOrgans),
///     )
///     .with_identity_resolver(IdentityResolver::new().with_metric(MatchingMetric::Dtw))
///     .run()?;
/// println!("{} time points, {} dropped", run.series.len(), run.dropped.len());
/// # Ok::<(), rsmltrack::RsmlTrackError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    candidates: CandidateResolver,
    parser: RsmlParser,
    identity: IdentityResolver,
}

impl Pipeline {
    pub fn new(candidates: CandidateResolver) -> Self {
        Self { candidates, parser: RsmlParser::new(), identity: IdentityResolver::new() }
    }

    /// Creates a pipeline with default settings for `directory`.
    pub fn for_directory<P: AsRef<Path>>(directory: P) -> Result<Self> {
        Ok(Self::new(CandidateResolver::for_directory(directory)?))
    }

    pub fn with_parser(mut self, parser: RsmlParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_identity_resolver(mut self, identity: IdentityResolver) -> Self {
        self.identity = identity;
        self
    }

    /// Selects and parses one snapshot per time point.
    pub fn load(&self) -> Result<LoadedSeries> {
        let resolution = self.candidates.resolve()?;
        Ok(build_series(resolution, &self.parser))
    }

    /// Loads the series and reconciles its identifiers.
    ///
    /// # Errors
    /// Fails if the directory cannot be listed or fewer than two time
    /// points survive selection and parsing.
    pub fn run(&self) -> Result<TrackingRun> {
        let LoadedSeries { mut series, dropped, resolution } = self.load()?;
        let report = self.identity.reconcile(&mut series)?;
        Ok(TrackingRun { series, report, dropped, resolution })
    }
}

/// Parses the selected candidates of `resolution` into a time-keyed series.
///
/// A snapshot is dated by its key, or else by the date in its image label.
/// Keys that fail to parse, carry no date or repeat an earlier instant are
/// dropped and recorded.
pub fn build_series(resolution: DirectoryResolution, parser: &RsmlParser) -> LoadedSeries {
    let mut series = SnapshotSeries::new();
    let mut dropped = resolution.dropped.clone();

    for (key, selected) in &resolution.selected {
        let snapshot = match parse_selected(parser, key, selected) {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                warn!(key, "dropping time point: cannot parse selected candidate");
                dropped.push(DroppedTimePoint::new(key.as_str(), reason));
                continue;
            }
        };

        let date = extract_date(key)
            .or_else(|| snapshot.metadata().image_label.as_deref().and_then(extract_date));
        match date {
            None => {
                warn!(key, "dropping time point: no date in key or image label");
                dropped.push(DroppedTimePoint::new(key.as_str(), DropReason::Undated));
            }
            Some(date) if series.contains_key(&date) => {
                warn!(key, %date, "dropping time point: date already taken");
                dropped.push(DroppedTimePoint::new(key.as_str(), DropReason::DuplicateTimePoint(date)));
            }
            Some(date) => {
                series.insert(date, snapshot);
            }
        }
    }

    info!(time_points = series.len(), dropped = dropped.len(), "built snapshot series");
    LoadedSeries { series, dropped, resolution }
}

fn parse_selected(parser: &RsmlParser, key: &str, selected: &SelectedCandidate) -> std::result::Result<Snapshot, DropReason> {
    let path = selected.candidate.path();
    parser.parse_document(&selected.document, key)
        .map(|snapshot| snapshot.with_source(path))
        .map_err(|error| DropReason::Parse(error.in_file(path)))
}
