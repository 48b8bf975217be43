//! Resolve candidate files into one canonical file per time point.
//!
//! An acquisition directory usually holds several markup files per time
//! point: revisions saved by the annotation tool (`.rsml01`, `.rsml02`, ...)
//! and corrected variants (`_corrected`). All files sharing the part of their
//! name before the `.rsml` extension form one candidate group, identified by
//! the logical key (that part without the `_corrected` suffix).
//!
//! - [Candidate] / [list_candidates] / [group_by_key]: discovery
//! - [validate] / [repair]: structural checks and the one automatic fix
//! - [SelectionStrategy]: how the best valid candidate is chosen
//! - [CandidateResolver]: the configurable per-directory pass
//! - [resolve_directory]: quick API with default configuration

mod candidate;
mod pixel;
mod resolver;
mod strategy;
mod validate;

pub use candidate::{group_by_key, list_candidates, Candidate, LoadedCandidate};
pub use pixel::ReferenceImage;
pub use resolver::{
    CandidateResolver, DirectoryResolution, DropReason, DroppedTimePoint, RejectedCandidate,
    SelectedCandidate,
};
pub use strategy::{SelectionStrategy, ALL_STRATEGIES};
pub use validate::{is_repairable, repair, validate, StructuralIssue};

use crate::error::Result;
use std::path::Path;

// ============================================================================
// Quick API
// ============================================================================
/// Resolves the candidates of `directory` using default settings.
///
/// # Example
/// ```no_run
/// use rsmltrack::selection::resolve_directory;
///
/// let resolution = resolve_directory("data/plate_1").unwrap();
/// for (key, selected) in &resolution.selected {
///     println!("{key}: {}", selected.candidate.path().display());
/// }
/// ```
pub fn resolve_directory<P: AsRef<Path>>(directory: P) -> Result<DirectoryResolution> {
    CandidateResolver::for_directory(directory)?.resolve()
}
