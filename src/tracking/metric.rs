//! Shape-similarity metrics used to match roots across time points.

use crate::model::{Point, Root};
use std::fmt;
use std::str::FromStr;

/// Dynamic Time Warping distance between two point sequences.
///
/// Per-step cost is the Euclidean distance between the aligned points; the
/// cumulative cost follows `D[i][j] = cost(i, j) + min(D[i-1][j], D[i][j-1], D[i-1][j-1])`
/// with the first row and column accumulated along the border.
///
/// # Returns
/// `D[n-1][m-1]`, or `f64::INFINITY` if either sequence is empty.
///
/// # Example
/// ```
/// use rsmltrack::model::Point;
/// use rsmltrack::tracking::dtw;
///
/// let a = [Point::new(0.0, 0.0), Point::new(0.0, 1.0)];
/// let b = [Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(0.0, 1.0)];
/// assert_eq!(dtw(&a, &b), 0.0);
/// ```
pub fn dtw(a: &[Point], b: &[Point]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }

    // Two rolling rows of the cumulative cost matrix
    let mut previous = vec![0.0; b.len()];
    let mut current = vec![0.0; b.len()];

    previous[0] = a[0].distance(&b[0]);
    for j in 1..b.len() {
        previous[j] = previous[j - 1] + a[0].distance(&b[j]);
    }

    for point in &a[1..] {
        current[0] = previous[0] + point.distance(&b[0]);
        for j in 1..b.len() {
            let cost = point.distance(&b[j]);
            current[j] = cost + previous[j].min(current[j - 1]).min(previous[j - 1]);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len() - 1]
}

/// Mean distance between points of equal position over the common prefix.
///
/// # Returns
/// The mean, or `f64::INFINITY` if either sequence is empty.
pub fn mean_pointwise(a: &[Point], b: &[Point]) -> f64 {
    let common = a.len().min(b.len());
    if common == 0 {
        return f64::INFINITY;
    }

    let sum: f64 = a.iter().zip(b).map(|(p, q)| p.distance(q)).sum();
    sum / common as f64
}

/// Euclidean distance between the insertion points of two roots.
pub fn insertion_distance(a: &Root, b: &Root) -> f64 {
    match (a.geometry().insertion_point(), b.geometry().insertion_point()) {
        (Some(p), Some(q)) => p.distance(&q),
        _ => f64::INFINITY,
    }
}


// =#========================================================================#=
// MATCHING METRIC
// =#========================================================================#=
/// How a root is compared with its candidates at a later time point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MatchingMetric {
    /// [dtw] over the flattened geometry points
    #[default]
    Dtw,
    /// Distance of the insertion points only
    InsertionPoint,
    /// [mean_pointwise] over the flattened geometry points
    MeanPointwise,
    /// Weighted sum of insertion-point distance and [dtw]
    ShapeAndInsertion { insertion_weight: f64, shape_weight: f64 },
    /// Clusters seeded from the final time point; see [crate::tracking::IdentityResolver]
    Cluster { centroid_weight: f64, shape_weight: f64 },
}

impl MatchingMetric {
    /// [MatchingMetric::ShapeAndInsertion] with weights 0.2 (insertion) and 0.8 (shape).
    pub const SHAPE_AND_INSERTION: MatchingMetric =
        MatchingMetric::ShapeAndInsertion { insertion_weight: 0.2, shape_weight: 0.8 };

    /// [MatchingMetric::Cluster] with weights 0.7 (centroid) and 0.3 (shape).
    pub const CLUSTER: MatchingMetric =
        MatchingMetric::Cluster { centroid_weight: 0.7, shape_weight: 0.3 };

    /// Distance between two roots; lower is more similar.
    ///
    /// For [MatchingMetric::Cluster] this is the score of `b` taken as a
    /// single-member cluster.
    pub fn distance(&self, a: &Root, b: &Root) -> f64 {
        match *self {
            Self::Dtw => dtw(&a.geometry().points(), &b.geometry().points()),
            Self::InsertionPoint => insertion_distance(a, b),
            Self::MeanPointwise => mean_pointwise(&a.geometry().points(), &b.geometry().points()),
            Self::ShapeAndInsertion { insertion_weight, shape_weight } => {
                insertion_weight * insertion_distance(a, b)
                    + shape_weight * dtw(&a.geometry().points(), &b.geometry().points())
            }
            Self::Cluster { centroid_weight, shape_weight } => {
                centroid_weight * insertion_distance(a, b)
                    + shape_weight * mean_pointwise(&a.geometry().points(), &b.geometry().points())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dtw => "dtw",
            Self::InsertionPoint => "insertion-point",
            Self::MeanPointwise => "mean-pointwise",
            Self::ShapeAndInsertion { .. } => "shape-and-insertion",
            Self::Cluster { .. } => "cluster",
        }
    }
}

impl fmt::Display for MatchingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchingMetric {
    type Err = String;

    /// Parses a metric name; weighted metrics get their default weights.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "dtw" => Ok(Self::Dtw),
            "insertion-point" => Ok(Self::InsertionPoint),
            "mean-pointwise" => Ok(Self::MeanPointwise),
            "shape-and-insertion" => Ok(Self::SHAPE_AND_INSERTION),
            "cluster" => Ok(Self::CLUSTER),
            other => Err(format!("unknown matching metric `{other}`")),
        }
    }
}
