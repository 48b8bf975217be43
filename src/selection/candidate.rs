//! Candidate files and their logical keys.

use crate::parser::xml::XmlElement;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

/// Suffix inserted before the extension of repaired variants
pub(crate) const CORRECTED_SUFFIX: &str = "_corrected";

/// Extension of candidate files; may be followed by a two-digit revision
pub(crate) const RSML_EXTENSION: &str = ".rsml";

static CANDIDATE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+)\.rsml(?P<revision>\d{2})?$").expect("candidate pattern is a valid regex")
});


// =#========================================================================#=
// CANDIDATE
// =#========================================================================#=
/// A file competing to represent one time point.
///
/// File names look like `<key>[_corrected].rsml[NN]`:
/// - the logical key is the whole name before `.rsml`, without `_corrected`,
///   so dotted dates such as `plate_17.05.2021` stay part of it
/// - `NN` is the two-digit revision; a bare `.rsml` is revision `0`
/// - `_corrected` marks a repaired variant written by this crate
///
/// # Example
/// ```
/// use rsmltrack::selection::Candidate;
///
/// let candidate = Candidate::from_path("data/plate_17_05_2021_corrected.rsml03").unwrap();
/// assert_eq!(candidate.key(), "plate_17_05_2021");
/// assert_eq!(candidate.revision(), 3);
/// assert!(candidate.is_corrected());
/// assert!(Candidate::from_path("data/plate.jpg").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate {
    path: PathBuf,
    key: String,
    revision: u32,
    corrected: bool,
}

impl Candidate {
    /// Interprets `path` as a candidate file, or returns `None` if its name
    /// does not end in `.rsml` or `.rsmlNN`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let file_name = path.file_name()?.to_str()?;
        let captures = CANDIDATE_NAME.captures(file_name)?;

        let revision = match captures.name("revision") {
            Some(digits) => digits.as_str().parse().ok()?,
            None => 0,
        };

        let name = &captures["name"];
        let corrected = name.ends_with(CORRECTED_SUFFIX);
        let key = name.strip_suffix(CORRECTED_SUFFIX).unwrap_or(name);
        if key.is_empty() {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            key: key.to_string(),
            revision,
            corrected,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical time-point key shared by all revisions of one snapshot.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Whether this is a repaired variant.
    pub fn is_corrected(&self) -> bool {
        self.corrected
    }

    /// Returns the candidate a repair of this file is written to:
    /// `x.rsml02` becomes `x_corrected.rsml02`.
    pub fn corrected(&self) -> Candidate {
        if self.corrected {
            return self.clone();
        }

        let file_name = self.file_name();
        let corrected_name = match file_name.rfind(RSML_EXTENSION) {
            Some(position) => format!("{}{CORRECTED_SUFFIX}{}", &file_name[..position], &file_name[position..]),
            None => format!("{file_name}{CORRECTED_SUFFIX}"),
        };

        Candidate {
            path: self.path.with_file_name(corrected_name),
            key: self.key.clone(),
            revision: self.revision,
            corrected: true,
        }
    }

    /// Returns the path of a sibling file sharing this candidate's stem,
    /// without `_corrected` and revision, with the given extension.
    ///
    /// `x_corrected.rsml02` with `jpg` gives `x.jpg`.
    pub fn sibling_with_extension(&self, extension: &str) -> PathBuf {
        let file_name = self.file_name();
        let stem = file_name.rfind(RSML_EXTENSION).map_or(file_name.as_str(), |position| &file_name[..position]);
        let stem = stem.strip_suffix(CORRECTED_SUFFIX).unwrap_or(stem);
        self.path.with_file_name(format!("{stem}.{extension}"))
    }

    fn file_name(&self) -> String {
        self.path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}


// =#========================================================================#=
// LOADED CANDIDATE
// =#========================================================================#=
/// A candidate together with its content, as needed for validation and
/// selection.
#[derive(Debug, Clone)]
pub struct LoadedCandidate {
    pub candidate: Candidate,
    pub text: String,
    pub document: XmlElement,
    pub modified: Option<SystemTime>,
}


// ============================================================================
// Directory listing (pub)
// ============================================================================
/// Returns all candidate files directly inside `directory`, sorted by path.
///
/// # Errors
/// Returns an I/O error if the directory cannot be listed.
pub fn list_candidates<P: AsRef<Path>>(directory: P) -> io::Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(candidate) = Candidate::from_path(entry.path()) {
            candidates.push(candidate);
        }
    }

    candidates.sort();
    Ok(candidates)
}

/// Partitions candidates by logical key; each group stays sorted by path.
pub fn group_by_key(candidates: Vec<Candidate>) -> BTreeMap<String, Vec<Candidate>> {
    let mut groups: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        groups.entry(candidate.key.clone()).or_default().push(candidate);
    }
    for group in groups.values_mut() {
        group.sort();
    }
    groups
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_candidate() {
        let candidate = Candidate::from_path("/d/ML1_12_03_2020.rsml").unwrap();
        assert_eq!(candidate.key(), "ML1_12_03_2020");
        assert_eq!(candidate.revision(), 0);
        assert!(!candidate.is_corrected());
    }

    #[test]
    fn test_key_keeps_inner_dots() {
        let candidate = Candidate::from_path("/d/ML1_12_03_2020.v2.rsml11").unwrap();
        assert_eq!(candidate.key(), "ML1_12_03_2020.v2");
        assert_eq!(candidate.revision(), 11);

        let corrected = Candidate::from_path("/d/plate_17.05.2021_corrected.rsml02").unwrap();
        assert_eq!(corrected.key(), "plate_17.05.2021");
        assert!(corrected.is_corrected());
    }

    #[test]
    fn test_dot_dated_names_form_separate_groups() {
        let candidates = ["/d/plate_17.05.2021.rsml", "/d/plate_17.06.2021.rsml", "/d/plate_17.05.2021.rsml01"]
            .iter()
            .filter_map(Candidate::from_path)
            .collect();
        let groups = group_by_key(candidates);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["plate_17.05.2021", "plate_17.06.2021"]);
        assert_eq!(groups["plate_17.05.2021"].len(), 2);
    }

    #[test]
    fn test_rejected_names() {
        assert!(Candidate::from_path("/d/x.rsml1").is_none());
        assert!(Candidate::from_path("/d/x.rsml123").is_none());
        assert!(Candidate::from_path("/d/x.rsml.bak").is_none());
        assert!(Candidate::from_path("/d/.rsml").is_none());
    }

    #[test]
    fn test_corrected_names() {
        let candidate = Candidate::from_path("/d/x.rsml02").unwrap();
        let corrected = candidate.corrected();
        assert_eq!(corrected.path(), Path::new("/d/x_corrected.rsml02"));
        assert_eq!(corrected.key(), "x");
        assert_eq!(corrected.revision(), 2);
        assert_eq!(Candidate::from_path(corrected.path()).as_ref(), Some(&corrected));
        assert_eq!(corrected.sibling_with_extension("jpg"), PathBuf::from("/d/x.jpg"));
    }

    #[test]
    fn test_grouping() {
        let candidates = ["/d/b.rsml", "/d/a.rsml01", "/d/a_corrected.rsml", "/d/a.rsml"]
            .iter()
            .filter_map(Candidate::from_path)
            .collect();
        let groups = group_by_key(candidates);

        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        let paths: Vec<_> = groups["a"].iter().map(|c| c.path().to_path_buf()).collect();
        assert_eq!(paths, vec![
            PathBuf::from("/d/a.rsml"),
            PathBuf::from("/d/a.rsml01"),
            PathBuf::from("/d/a_corrected.rsml"),
        ]);
    }
}
