//! Domain model of a root-system time series.
//!
//! - [Snapshot](snapshot::Snapshot): metadata plus scene of one time point
//! - [Plant](plant::Plant): arena of [Root](root::Root)s; parent and children
//!   are stored as [RootIndex](root::RootIndex), not as references
//! - [Geometry](geometry::Geometry): polyline shape of a root

/// Points, polylines and root geometry
pub mod geometry;
/// Snapshot metadata and schema variants
pub mod metadata;
/// Plant arena and traversal
pub mod plant;
/// Root, its attached data and label classification
pub mod root;
/// Scene, snapshot and time series
pub mod snapshot;

pub use geometry::{Geometry, Point, Polyline};
pub use metadata::{Metadata, PropertyDefinition, SchemaVariant};
pub use plant::Plant;
pub use root::{Annotation, Function, Property, Root, RootIndex, RootKind};
pub use snapshot::{RootRef, Scene, Snapshot, SnapshotSeries};
