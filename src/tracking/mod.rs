//! Reconcile root identities across the time points of a series.
//!
//! The identity of a root is its identifier. Upstream annotation gives the
//! same physical root different identifiers at different time points; this
//! module rewrites them so an identifier, once it appears, stays.
//!
//! - [PresenceMap] / [classify_presence]: presence vectors and their
//!   [Continuity] class
//! - [MatchingMetric] / [dtw]: how roots are compared
//! - [IdentityResolver]: the configurable backward pass
//! - [compare_with_reference]: evaluation against ground truth
//! - [reconcile]: quick API with default configuration

mod cluster;
mod evaluation;
mod metric;
mod presence;
mod resolver;

pub use evaluation::{compare_with_reference, TimePointComparison};
pub use metric::{dtw, insertion_distance, mean_pointwise, MatchingMetric};
pub use presence::{classify_presence, Classification, Continuity, PresenceMap};
pub use resolver::{IdentityResolver, MatchOutcome, ResolutionReport, RootOutcome};

use crate::model::SnapshotSeries;
use thiserror::Error;

/// Failure of a whole reconciliation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    #[error("reconciliation needs at least two time points, got {0}")]
    TooFewTimePoints(usize),
}

// ============================================================================
// Quick API
// ============================================================================
/// Reconciles the identifiers of `series` using default settings.
///
/// # Errors
/// Returns [TrackingError::TooFewTimePoints] for fewer than two time points.
pub fn reconcile(series: &mut SnapshotSeries) -> Result<ResolutionReport, TrackingError> {
    IdentityResolver::new().reconcile(series)
}
