//! Geometry module for root shapes.
//!
//! A root is drawn as one (conventionally exactly one) polyline of 2-D
//! points, ordered from the insertion point towards the tip.
//! - [Point]: single `(x, y)` coordinate
//! - [Polyline]: ordered points of one root segment
//! - [Geometry]: ordered polylines of one root

// =#========================================================================#=
// POINT
// =#========================================================================#=
/// A real-valued 2-D coordinate, in image pixels unless rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Returns this point with both coordinates multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }
}


// =#========================================================================#=
// POLYLINE
// =#========================================================================#=
/// Ordered sequence of [Point]s describing one root segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    /// Creates a polyline from the given points, kept in order.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Appends a point at the tip end.
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Arc length, i.e. sum of the distances between consecutive points.
    pub fn length(&self) -> f64 {
        self.points.windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum()
    }
}


// =#========================================================================#=
// GEOMETRY
// =#========================================================================#=
/// Shape of a root as an ordered sequence of [Polyline]s.
///
/// RSML allows several polylines per root, but producers practically always
/// write exactly one. All derived values treat the polylines as one
/// concatenated point sequence.
///
/// # Example
/// ```
/// use rsmltrack::model::geometry::{Geometry, Point, Polyline};
///
/// let geometry = Geometry::from_points(vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
/// assert_eq!(geometry.total_length(), 5.0);
/// assert_eq!(geometry.insertion_point(), Some(Point::new(0.0, 0.0)));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    polylines: Vec<Polyline>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Geometry {
    /// Creates a geometry from a list of polylines.
    pub fn new(polylines: Vec<Polyline>) -> Self {
        Self { polylines }
    }

    /// Creates a geometry holding a single polyline with the given points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self::new(vec![Polyline::new(points)])
    }

    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    /// Returns the number of points over all polylines.
    pub fn num_points(&self) -> usize {
        self.polylines.iter().map(Polyline::len).sum()
    }

    /// Returns `true` if there is no point at all.
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// Returns all points of all polylines as one flat, ordered list.
    pub fn points(&self) -> Vec<Point> {
        self.polylines.iter()
            .flat_map(|polyline| polyline.points().iter().copied())
            .collect()
    }

    /// Returns the first point, where the root emerges from its parent
    /// (or from the seed for primary roots).
    pub fn insertion_point(&self) -> Option<Point> {
        self.polylines.iter()
            .find_map(|polyline| polyline.points().first().copied())
    }

    /// Returns the last point, i.e. the tip of the root.
    pub fn tip(&self) -> Option<Point> {
        self.polylines.iter()
            .rev()
            .find_map(|polyline| polyline.points().last().copied())
    }

    /// Sum of the arc lengths of all polylines.
    pub fn total_length(&self) -> f64 {
        self.polylines.iter().map(Polyline::length).sum()
    }

    /// Multiplies every coordinate by `factor`, e.g. to convert pixels
    /// into the unit of the metadata resolution.
    pub fn scale(&mut self, factor: f64) {
        for polyline in &mut self.polylines {
            for point in &mut polyline.points {
                *point = point.scaled(factor);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_over_several_polylines() {
        let geometry = Geometry::new(vec![
            Polyline::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 2.0)]),
            Polyline::new(vec![Point::new(1.0, 1.0), Point::new(1.0, 4.0)]),
        ]);
        assert_eq!(geometry.total_length(), 5.0);
        assert_eq!(geometry.num_points(), 4);
        assert_eq!(geometry.tip(), Some(Point::new(1.0, 4.0)));
    }

    #[test]
    fn test_scale() {
        let mut geometry = Geometry::from_points(vec![Point::new(1.0, 2.0), Point::new(2.0, 2.0)]);
        geometry.scale(0.5);
        assert_eq!(geometry.points(), vec![Point::new(0.5, 1.0), Point::new(1.0, 1.0)]);
    }

    #[test]
    fn test_empty_geometry() {
        let geometry = Geometry::default();
        assert!(geometry.is_empty());
        assert_eq!(geometry.insertion_point(), None);
        assert_eq!(geometry.total_length(), 0.0);
    }
}
