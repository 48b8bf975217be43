//! rsmltrack reconciles RSML snapshots of a growing root system into one
//! identity-consistent time series.
//!
//! An acquisition directory holds one or more RSML (Root System Markup
//! Language) files per time point. Each file describes the root system at
//! that time point as a forest of roots, but the annotation tool does not
//! keep root identifiers stable over time. This crate offers:
//! - Selection: group candidate files by time point, validate them, repair
//!   the one common structural defect and pick one file per time point with
//!   a configurable [SelectionStrategy](selection::SelectionStrategy).
//!   See [crate::selection].
//! - Parsing: read RSML (plain 2-D and 2-D+T layouts) into the
//!   [Snapshot](model::Snapshot) model and write it back. See [crate::rsml].
//! - Tracking: walk the series backward and rewrite root identifiers by
//!   shape similarity so each physical root keeps one identifier.
//!   See [crate::tracking].
//! - Model: arena-based plants; roots reference parent and children by
//!   index, not by pointer. See [crate::model].
//!
//! Problems with single files or time points never abort a run. They are
//! logged with `tracing` and reported in the results.
//!
//! # Usage patterns
//! 1. Quick API functions with default settings: [track_directory],
//!    [parse_rsml_file], [reconcile].
//! 2. Configured use through [CandidateResolver](selection::CandidateResolver),
//!    [RsmlParser](rsml::RsmlParser), [IdentityResolver](tracking::IdentityResolver)
//!    and [Pipeline](pipeline::Pipeline).
//!
//! ## Example Default Configuration
//! ```no_run
//! use rsmltrack::track_directory;
//!
//! let run = track_directory("data/plate_1").unwrap();
//! println!(
//!     "{} time points: {} roots well classified, {} misclassified",
//!     run.series.len(),
//!     run.report.well_classified,
//!     run.report.misclassified,
//! );
//! ```
//!
//! ## Example Configuration
//! ```no_run
//! use rsmltrack::pipeline::Pipeline;
//! use rsmltrack::selection::{CandidateResolver, SelectionStrategy};
//! use rsmltrack::tracking::{IdentityResolver, MatchingMetric};
//!
//! let resolver = CandidateResolver::for_directory("data/plate_1")?
//!     .with_strategy(SelectionStrategy::MostOrgans)  // Most root elements
//!     .with_fallback(SelectionStrategy::LastVersion) // Ties: newest revision
//!     .with_repair_output(false);                    // Repair in memory only
//!
//! let run = Pipeline::new(resolver)
//!     .with_identity_resolver(IdentityResolver::new().with_metric(MatchingMetric::CLUSTER))
//!     .run()?;
//! println!("dropped: {:?}", run.dropped_dates());
//! # Ok::<(), rsmltrack::RsmlTrackError>(())
//! ```

pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod rsml;
pub mod selection;
pub mod tracking;

pub use error::{Result, RsmlTrackError};

use crate::model::{Snapshot, SnapshotSeries};
use crate::parser::ParsingError;
use crate::pipeline::{Pipeline, TrackingRun};
use crate::tracking::{ResolutionReport, TrackingError};
use std::path::Path;

// ============================================================================
// Quick API
// ============================================================================
/// Selects, parses and reconciles the candidates of `directory` using
/// default settings.
///
/// See [Pipeline] for configuration.
pub fn track_directory<P: AsRef<Path>>(directory: P) -> Result<TrackingRun> {
    Pipeline::for_directory(directory)?.run()
}

/// Parses one RSML file using default settings.
///
/// See [`rsml::parse_file`] for full documentation.
pub fn parse_rsml_file<P: AsRef<Path>>(path: P, key: &str) -> std::result::Result<Snapshot, ParsingError> {
    rsml::parse_file(path, key)
}

/// Reconciles root identifiers of `series` in place using default settings.
///
/// See [`tracking::reconcile`] for full documentation.
pub fn reconcile(series: &mut SnapshotSeries) -> std::result::Result<ResolutionReport, TrackingError> {
    tracking::reconcile(series)
}
