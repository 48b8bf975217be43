//! Ranked strategies choosing one candidate per logical key.

use crate::parser::xml::XmlElement;
use crate::rsml::defs::{ATTR_COORD_X, ATTR_COORD_Y, ATTR_X, ATTR_Y, POINT, ROOT};
use crate::model::Point;
use crate::selection::candidate::LoadedCandidate;
use crate::selection::pixel::ReferenceImage;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

/// A line holding a single element whose value is exactly `0.0`.
static ZERO_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<.*>0\.0</.*>$").expect("zero-line pattern is a valid regex"));


// =#========================================================================#=
// SELECTION STRATEGY
// =#========================================================================#=
/// Strategy for choosing among valid candidates of one logical key.
///
/// Each strategy is a ranked list of criteria. Candidates are filtered to
/// the best value of the first criterion; remaining ties go to the next
/// criterion, then to the criteria of the configured fallback strategy and
/// finally to path order. Selection therefore depends only on the strategy,
/// the fallback and the candidates' content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionStrategy {
    /// Highest revision suffix
    LastVersion,
    /// Lowest revision suffix
    FirstVersion,
    /// Most lines of text
    MostLines,
    /// Fewest lines holding a lone `0.0` value
    LeastZeros,
    LeastZerosMostLines,
    MostLinesLeastZeros,
    /// Newest file modification time
    MostRecentTimestamp,
    /// Most markup tags
    #[default]
    MostComplexity,
    /// Most root elements, ties by fewest duplicate lines
    MostOrgans,
    /// Fewest lines whose content occurs more than once
    LeastDuplicates,
    /// Point on the reference image whose grey level is closest to the target
    ClosestPixelValue,
    ClosestPixelValueMostOrgans,
}

/// All strategies, in declaration order.
pub const ALL_STRATEGIES: [SelectionStrategy; 12] = [
    SelectionStrategy::LastVersion,
    SelectionStrategy::FirstVersion,
    SelectionStrategy::MostLines,
    SelectionStrategy::LeastZeros,
    SelectionStrategy::LeastZerosMostLines,
    SelectionStrategy::MostLinesLeastZeros,
    SelectionStrategy::MostRecentTimestamp,
    SelectionStrategy::MostComplexity,
    SelectionStrategy::MostOrgans,
    SelectionStrategy::LeastDuplicates,
    SelectionStrategy::ClosestPixelValue,
    SelectionStrategy::ClosestPixelValueMostOrgans,
];

impl SelectionStrategy {
    /// Criteria applied in order.
    pub(crate) fn criteria(&self) -> &'static [Criterion] {
        use Criterion::*;
        match self {
            SelectionStrategy::LastVersion => &[HighestRevision],
            SelectionStrategy::FirstVersion => &[LowestRevision],
            SelectionStrategy::MostLines => &[MostLines],
            SelectionStrategy::LeastZeros => &[LeastZeros],
            SelectionStrategy::LeastZerosMostLines => &[LeastZeros, MostLines],
            SelectionStrategy::MostLinesLeastZeros => &[MostLines, LeastZeros],
            SelectionStrategy::MostRecentTimestamp => &[NewestModification],
            SelectionStrategy::MostComplexity => &[MostTags],
            SelectionStrategy::MostOrgans => &[MostOrgans, LeastDuplicates],
            SelectionStrategy::LeastDuplicates => &[LeastDuplicates],
            SelectionStrategy::ClosestPixelValue => &[ClosestPixel],
            SelectionStrategy::ClosestPixelValueMostOrgans => &[ClosestPixel, MostOrgans],
        }
    }

    /// Whether the strategy needs the reference image of the time point.
    pub fn uses_reference_image(&self) -> bool {
        self.criteria().contains(&Criterion::ClosestPixel)
    }

    /// Kebab-case name, as accepted by [FromStr].
    pub fn name(&self) -> &'static str {
        match self {
            SelectionStrategy::LastVersion => "last-version",
            SelectionStrategy::FirstVersion => "first-version",
            SelectionStrategy::MostLines => "most-lines",
            SelectionStrategy::LeastZeros => "least-zeros",
            SelectionStrategy::LeastZerosMostLines => "least-zeros-most-lines",
            SelectionStrategy::MostLinesLeastZeros => "most-lines-least-zeros",
            SelectionStrategy::MostRecentTimestamp => "most-recent-timestamp",
            SelectionStrategy::MostComplexity => "most-complexity",
            SelectionStrategy::MostOrgans => "most-organs",
            SelectionStrategy::LeastDuplicates => "least-duplicates",
            SelectionStrategy::ClosestPixelValue => "closest-pixel-value",
            SelectionStrategy::ClosestPixelValueMostOrgans => "closest-pixel-value-most-organs",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    /// Parses kebab-case (`most-organs`) or screaming snake case (`MOST_ORGANS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ALL_STRATEGIES.iter()
            .find(|strategy| strategy.name() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown selection strategy `{s}`"))
    }
}


// =#========================================================================#=
// CRITERIA
// =#========================================================================#=
/// Single ranking criterion; a higher score is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Criterion {
    HighestRevision,
    LowestRevision,
    MostLines,
    LeastZeros,
    NewestModification,
    MostTags,
    MostOrgans,
    LeastDuplicates,
    ClosestPixel,
}

/// Per-key inputs shared by all candidates of the key.
#[derive(Debug, Default)]
pub(crate) struct ScoringContext {
    pub reference_image: Option<ReferenceImage>,
    pub pixel_target: f64,
}

impl Criterion {
    /// Scores `loaded`; `None` when the criterion cannot be evaluated,
    /// which ranks below every real score.
    fn score(&self, loaded: &LoadedCandidate, context: &ScoringContext) -> Option<f64> {
        let score = match self {
            Criterion::HighestRevision => f64::from(loaded.candidate.revision()),
            Criterion::LowestRevision => -f64::from(loaded.candidate.revision()),
            Criterion::MostLines => loaded.text.lines().count() as f64,
            Criterion::LeastZeros => -(count_zero_lines(&loaded.text) as f64),
            Criterion::NewestModification => {
                loaded.modified?.duration_since(UNIX_EPOCH).ok()?.as_secs_f64()
            }
            Criterion::MostTags => loaded.text.matches('<').count() as f64,
            Criterion::MostOrgans => loaded.document.count_named(ROOT) as f64,
            Criterion::LeastDuplicates => -(count_duplicate_lines(&loaded.text) as f64),
            Criterion::ClosestPixel => {
                let image = context.reference_image.as_ref()?;
                -image.closest_distance(document_points(&loaded.document), context.pixel_target)?
            }
        };
        Some(score)
    }
}

fn count_zero_lines(text: &str) -> usize {
    text.lines().filter(|line| ZERO_LINE.is_match(line.trim())).count()
}

/// Number of non-blank lines whose trimmed content occurs more than once,
/// counting every occurrence.
fn count_duplicate_lines(text: &str) -> usize {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        *occurrences.entry(line).or_default() += 1;
    }
    occurrences.values().filter(|&&count| count > 1).sum()
}

fn document_points(document: &XmlElement) -> impl Iterator<Item = Point> + '_ {
    document.descendants_named(POINT).filter_map(|point| {
        let x = point.attribute(ATTR_X).or_else(|| point.attribute(ATTR_COORD_X))?;
        let y = point.attribute(ATTR_Y).or_else(|| point.attribute(ATTR_COORD_Y))?;
        Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
    })
}

/// Keeps the candidates sharing the best score of `criterion`.
fn keep_best<'a>(
    candidates: Vec<&'a LoadedCandidate>,
    criterion: Criterion,
    context: &ScoringContext,
) -> Vec<&'a LoadedCandidate> {
    let scored: Vec<(f64, &LoadedCandidate)> = candidates.into_iter()
        .map(|loaded| (criterion.score(loaded, context).unwrap_or(f64::NEG_INFINITY), loaded))
        .collect();

    let Some(best) = scored.iter().map(|(score, _)| *score).max_by(f64::total_cmp) else {
        return Vec::new();
    };

    scored.into_iter()
        .filter(|(score, _)| score.total_cmp(&best).is_eq())
        .map(|(_, loaded)| loaded)
        .collect()
}

/// Selects one candidate by `strategy`, breaking ties by `fallback` and
/// finally by position in `candidates`.
///
/// # Returns
/// `None` only if `candidates` is empty.
pub(crate) fn select<'a>(
    candidates: &'a [LoadedCandidate],
    strategy: SelectionStrategy,
    fallback: SelectionStrategy,
    context: &ScoringContext,
) -> Option<&'a LoadedCandidate> {
    let mut remaining: Vec<&LoadedCandidate> = candidates.iter().collect();

    for &criterion in strategy.criteria().iter().chain(fallback.criteria()) {
        if remaining.len() <= 1 {
            break;
        }
        remaining = keep_best(remaining, criterion, context);
    }

    remaining.first().copied().or_else(|| candidates.first())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse_str;
    use crate::selection::candidate::Candidate;

    fn loaded(path: &str, text: &str) -> LoadedCandidate {
        LoadedCandidate {
            candidate: Candidate::from_path(path).unwrap(),
            text: text.to_string(),
            document: parse_str(text).unwrap(),
            modified: None,
        }
    }

    #[test]
    fn test_strategy_names() {
        for strategy in ALL_STRATEGIES {
            assert_eq!(strategy.to_string().parse::<SelectionStrategy>(), Ok(strategy));
        }
        assert_eq!("MOST_ORGANS".parse::<SelectionStrategy>(), Ok(SelectionStrategy::MostOrgans));
        assert!("random".parse::<SelectionStrategy>().is_err());
    }

    #[test]
    fn test_line_counters() {
        let text = "<a>\n  <v>0.0</v>\n  <v>0.0</v>\n  <w>1.0</w>\n\n</a>";
        assert_eq!(count_zero_lines(text), 2);
        assert_eq!(count_duplicate_lines(text), 2);
    }

    #[test]
    fn test_fallback_breaks_ties() {
        let candidates = vec![
            loaded("/d/k.rsml", "<r><root/></r>"),
            loaded("/d/k.rsml02", "<r><root/></r>"),
            loaded("/d/k.rsml01", "<r><root/></r>"),
        ];
        let context = ScoringContext::default();

        let last = select(&candidates, SelectionStrategy::MostOrgans, SelectionStrategy::LastVersion, &context);
        assert_eq!(last.unwrap().candidate.revision(), 2);
        let first = select(&candidates, SelectionStrategy::MostOrgans, SelectionStrategy::FirstVersion, &context);
        assert_eq!(first.unwrap().candidate.revision(), 0);
    }

    #[test]
    fn test_missing_image_leaves_tie_to_fallback() {
        let candidates = vec![
            loaded("/d/k.rsml", r#"<r><point x="1" y="1"/></r>"#),
            loaded("/d/k.rsml03", r#"<r><point x="2" y="2"/></r>"#),
        ];
        let selected = select(
            &candidates,
            SelectionStrategy::ClosestPixelValue,
            SelectionStrategy::LastVersion,
            &ScoringContext::default(),
        );
        assert_eq!(selected.unwrap().candidate.revision(), 3);
    }
}
