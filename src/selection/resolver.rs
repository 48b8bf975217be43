//! Per-directory candidate resolution: validate, repair, select.

use crate::error::{Result, RsmlTrackError};
use crate::parser::date::extract_date;
use crate::parser::xml::{self, XmlElement};
use crate::parser::ParsingError;
use crate::selection::candidate::{group_by_key, list_candidates, Candidate, LoadedCandidate};
use crate::selection::pixel::ReferenceImage;
use crate::selection::strategy::{select, ScoringContext, SelectionStrategy};
use crate::selection::validate::{is_repairable, repair, validate, StructuralIssue};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};


// =#========================================================================#=
// RESULTS
// =#========================================================================#=
/// The candidate chosen for one logical key.
#[derive(Debug, Clone)]
pub struct SelectedCandidate {
    pub candidate: Candidate,
    /// Whether the candidate is a repair made during this resolution
    pub repaired: bool,
    /// Markup of the candidate, ready for the RSML parser
    pub document: XmlElement,
}

/// A candidate that was discarded, with the reasons.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub path: PathBuf,
    pub issues: Vec<StructuralIssue>,
}

/// Why a time point was removed from the series.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// Every candidate of the key was invalid and unrepairable
    NoValidCandidate(Vec<RejectedCandidate>),
    /// The selected candidate failed to parse
    Parse(ParsingError),
    /// Neither the key nor the image label holds a date
    Undated,
    /// An earlier key already resolved to the same instant
    DuplicateTimePoint(NaiveDateTime),
}

/// A logical key that did not make it into the series.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedTimePoint {
    pub key: String,
    /// Date read from the key, if any
    pub date: Option<NaiveDateTime>,
    pub reason: DropReason,
}

impl DroppedTimePoint {
    pub fn new(key: impl Into<String>, reason: DropReason) -> Self {
        let key = key.into();
        Self { date: extract_date(&key), key, reason }
    }
}

/// Outcome of resolving one directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolution {
    /// Chosen candidate per logical key
    pub selected: BTreeMap<String, SelectedCandidate>,
    /// Keys without any valid candidate
    pub dropped: Vec<DroppedTimePoint>,
    /// Invalid candidates of keys that still had a valid one
    pub rejected: Vec<RejectedCandidate>,
    /// Paths of repaired variants produced (written if enabled)
    pub repaired: Vec<PathBuf>,
}

/// Result of one key, before assembly.
enum KeyOutcome {
    Selected {
        selected: SelectedCandidate,
        rejected: Vec<RejectedCandidate>,
        repaired: Vec<PathBuf>,
    },
    Dropped(DroppedTimePoint),
}


// =#========================================================================#=
// CANDIDATE RESOLVER
// =#========================================================================#=
/// Chooses one canonical candidate file per logical key of a directory.
///
/// For each key, every candidate is validated. A candidate whose only
/// defect is laterals attached to the plant is repaired (if it has exactly
/// one primary root) and the repair joins the group as
/// `<stem>_corrected.rsml[NN]`. Remaining invalid candidates are discarded
/// and a key without valid candidates is dropped. Among valid candidates the
/// configured [SelectionStrategy] picks one, ties going to the fallback.
///
/// Keys are resolved in parallel on a dedicated thread pool; if the pool
/// cannot be built or a worker panics, resolution reruns sequentially.
/// Original candidate files are never modified.
///
/// # Example
/// ```no_run
/// use rsmltrack::selection::{CandidateResolver, SelectionStrategy};
///
/// let resolution = CandidateResolver::for_directory("data/plate_1")?
///     .with_strategy(SelectionStrategy::MostOrgans)
///     .with_fallback(SelectionStrategy::LastVersion)
///     .resolve()?;
/// println!("{} time points, {} dropped", resolution.selected.len(), resolution.dropped.len());
/// # Ok::<(), rsmltrack::RsmlTrackError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CandidateResolver {
    directory: PathBuf,
    strategy: SelectionStrategy,
    fallback: SelectionStrategy,
    pixel_target: f64,
    write_repairs: bool,
    parallel: bool,
    threads: Option<usize>,
}

// ============================================================================
// Configuration (pub)
// ============================================================================
impl CandidateResolver {
    /// Creates a resolver for `directory` with default configuration.
    ///
    /// # Errors
    /// Returns [RsmlTrackError::Directory] if `directory` is not a readable directory.
    pub fn for_directory<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if let Err(source) = fs::read_dir(&directory) {
            return Err(RsmlTrackError::Directory { path: directory, source });
        }

        Ok(Self {
            directory,
            strategy: SelectionStrategy::default(),
            fallback: SelectionStrategy::LastVersion,
            pixel_target: 0.0,
            write_repairs: true,
            parallel: true,
            threads: None,
        })
    }

    /// Sets the primary selection strategy (default: most complexity).
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the strategy breaking ties left by the primary one (default: last version).
    pub fn with_fallback(mut self, fallback: SelectionStrategy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sets the grey level the pixel-value strategies aim for (default: 0.0).
    pub fn with_pixel_target(mut self, target: f64) -> Self {
        self.pixel_target = target;
        self
    }

    /// Sets whether repaired variants are written next to the originals
    /// (default: on). Without writing, repairs are only used in memory.
    pub fn with_repair_output(mut self, write: bool) -> Self {
        self.write_repairs = write;
        self
    }

    /// Sets whether keys are resolved in parallel (default: on).
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the number of worker threads of the parallel pass
    /// (default: number of CPUs).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn fallback(&self) -> SelectionStrategy {
        self.fallback
    }
}

// ============================================================================
// Resolution (pub)
// ============================================================================
impl CandidateResolver {
    /// Resolves every logical key of the directory.
    ///
    /// # Errors
    /// Returns [RsmlTrackError::Directory] if the directory cannot be listed.
    /// Problems with single candidates or keys are reported in the result.
    pub fn resolve(&self) -> Result<DirectoryResolution> {
        let candidates = list_candidates(&self.directory).map_err(|source| RsmlTrackError::Directory {
            path: self.directory.clone(),
            source,
        })?;
        let groups: Vec<(String, Vec<Candidate>)> = group_by_key(candidates).into_iter().collect();
        debug!(directory = %self.directory.display(), keys = groups.len(), "grouped candidates");

        let outcomes = if self.parallel {
            self.resolve_parallel(&groups).unwrap_or_else(|reason| {
                warn!(%reason, "parallel candidate resolution failed, retrying sequentially");
                self.resolve_sequential(&groups)
            })
        } else {
            self.resolve_sequential(&groups)
        };

        let mut resolution = DirectoryResolution::default();
        for outcome in outcomes {
            match outcome {
                KeyOutcome::Selected { selected, rejected, repaired } => {
                    resolution.rejected.extend(rejected);
                    resolution.repaired.extend(repaired);
                    resolution.selected.insert(selected.candidate.key().to_string(), selected);
                }
                KeyOutcome::Dropped(dropped) => resolution.dropped.push(dropped),
            }
        }

        info!(
            selected = resolution.selected.len(),
            dropped = resolution.dropped.len(),
            repaired = resolution.repaired.len(),
            strategy = %self.strategy,
            "resolved candidate directory"
        );
        Ok(resolution)
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl CandidateResolver {
    fn resolve_sequential(&self, groups: &[(String, Vec<Candidate>)]) -> Vec<KeyOutcome> {
        groups.iter()
            .map(|(key, candidates)| self.resolve_key(key, candidates))
            .collect()
    }

    fn resolve_parallel(&self, groups: &[(String, Vec<Candidate>)]) -> std::result::Result<Vec<KeyOutcome>, String> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().map_err(|error| error.to_string())?;

        panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                groups.par_iter()
                    .map(|(key, candidates)| self.resolve_key(key, candidates))
                    .collect::<Vec<_>>()
            })
        }))
        .map_err(|_| "a worker panicked".to_string())
    }

    fn resolve_key(&self, key: &str, candidates: &[Candidate]) -> KeyOutcome {
        let mut valid: Vec<LoadedCandidate> = Vec::new();
        let mut rejected: Vec<RejectedCandidate> = Vec::new();
        let mut repaired: Vec<PathBuf> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for candidate in candidates {
            if !seen.insert(candidate.path().to_path_buf()) {
                continue;
            }

            let loaded = match load(candidate) {
                Ok(loaded) => loaded,
                Err(issue) => {
                    warn!(path = %candidate.path().display(), %issue, "discarding candidate");
                    rejected.push(RejectedCandidate { path: candidate.path().to_path_buf(), issues: vec![issue] });
                    continue;
                }
            };

            let issues = validate(&loaded.document);
            if issues.is_empty() {
                valid.push(loaded);
                continue;
            }

            match is_repairable(&issues).then(|| self.repair(&loaded)).flatten() {
                Some(fixed) => {
                    info!(path = %candidate.path().display(), repaired = %fixed.candidate.path().display(), "repaired candidate");
                    seen.insert(fixed.candidate.path().to_path_buf());
                    repaired.push(fixed.candidate.path().to_path_buf());
                    valid.push(fixed);
                }
                None => {
                    warn!(path = %candidate.path().display(), issues = issues.len(), "discarding invalid candidate");
                    rejected.push(RejectedCandidate { path: candidate.path().to_path_buf(), issues });
                }
            }
        }

        let context = self.scoring_context(&valid);
        match select(&valid, self.strategy, self.fallback, &context) {
            Some(chosen) => {
                debug!(key, path = %chosen.candidate.path().display(), candidates = valid.len(), "selected candidate");
                let selected = SelectedCandidate {
                    repaired: repaired.iter().any(|path| path == chosen.candidate.path()),
                    candidate: chosen.candidate.clone(),
                    document: chosen.document.clone(),
                };
                KeyOutcome::Selected { selected, rejected, repaired }
            }
            None => {
                warn!(key, "no valid candidate, dropping time point");
                KeyOutcome::Dropped(DroppedTimePoint::new(key, DropReason::NoValidCandidate(rejected)))
            }
        }
    }

    /// Repairs `loaded`, writing the repaired variant if enabled.
    fn repair(&self, loaded: &LoadedCandidate) -> Option<LoadedCandidate> {
        let document = repair(&loaded.document)?;
        if !validate(&document).is_empty() {
            return None;
        }

        let candidate = loaded.candidate.corrected();
        let text = match xml::to_xml_string(&document) {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "cannot serialize repaired candidate");
                return None;
            }
        };

        if self.write_repairs {
            if let Err(error) = fs::write(candidate.path(), &text) {
                warn!(path = %candidate.path().display(), %error, "cannot write repaired candidate, keeping it in memory");
            }
        }

        // A repair ranks by when its source was saved, not by when it was written
        Some(LoadedCandidate { candidate, text, document, modified: loaded.modified })
    }

    fn scoring_context(&self, valid: &[LoadedCandidate]) -> ScoringContext {
        let mut context = ScoringContext { reference_image: None, pixel_target: self.pixel_target };
        if !(self.strategy.uses_reference_image() || self.fallback.uses_reference_image()) {
            return context;
        }

        let Some(path) = valid.first().and_then(|loaded| ReferenceImage::locate(&loaded.candidate)) else {
            debug!("no reference image found");
            return context;
        };

        match ReferenceImage::open(&path) {
            Ok(image) => context.reference_image = Some(image),
            Err(error) => warn!(path = %path.display(), %error, "cannot open reference image"),
        }
        context
    }
}

fn load(candidate: &Candidate) -> std::result::Result<LoadedCandidate, StructuralIssue> {
    let text = fs::read_to_string(candidate.path())
        .map_err(|error| StructuralIssue::Unreadable(error.to_string()))?;
    let document = xml::parse_str(&text)
        .map_err(|error| StructuralIssue::Unreadable(error.to_string()))?;
    let modified = fs::metadata(candidate.path()).and_then(|metadata| metadata.modified()).ok();

    Ok(LoadedCandidate { candidate: candidate.clone(), text, document, modified })
}
