//! Snapshot module: everything known about the root system at one time point.

use crate::model::metadata::Metadata;
use crate::model::plant::Plant;
use crate::model::root::{Root, RootIndex};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Time-ordered snapshots of one root system, keyed by acquisition time.
pub type SnapshotSeries = BTreeMap<NaiveDateTime, Snapshot>;

/// Address of a root within a [Snapshot]: plant position plus arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootRef {
    pub plant: usize,
    pub root: RootIndex,
}

impl RootRef {
    pub fn new(plant: usize, root: RootIndex) -> Self {
        Self { plant, root }
    }
}


// =#========================================================================#=
// SCENE
// =#========================================================================#=
/// Plants captured at one time point, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    plants: Vec<Plant>,
}

impl Scene {
    pub fn new(plants: Vec<Plant>) -> Self {
        Self { plants }
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn plants_mut(&mut self) -> &mut [Plant] {
        &mut self.plants
    }
}


// =#========================================================================#=
// SNAPSHOT
// =#========================================================================#=
/// One time point's parsed root system: [Metadata] plus [Scene].
///
/// Created once per parse. The only mutation after parsing is the rewrite of
/// root identifiers via [Snapshot::set_root_id].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    metadata: Metadata,
    scene: Scene,
    /// Logical key of the candidate group this snapshot was selected from
    key: String,
    /// File the snapshot was parsed from, if any
    source: Option<PathBuf>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Snapshot {
    pub fn new(metadata: Metadata, scene: Scene) -> Self {
        Self { metadata, scene, key: String::new(), source: None }
    }

    /// Attaches the logical key of the originating candidate group.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Attaches the path of the originating file.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn plants(&self) -> &[Plant] {
        self.scene.plants()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Returns the number of roots over all plants.
    pub fn num_roots(&self) -> usize {
        self.plants().iter().map(Plant::num_roots).sum()
    }

    /// Returns the root at `root_ref`.
    ///
    /// # Panics
    /// Panics if `root_ref` does not address a root of this snapshot.
    pub fn root(&self, root_ref: RootRef) -> &Root {
        &self.plants()[root_ref.plant][root_ref.root]
    }

    /// Returns all roots of all plants in pre-order, plant by plant.
    pub fn roots(&self) -> impl Iterator<Item = (RootRef, &Root)> + '_ {
        self.plants().iter().enumerate().flat_map(|(plant_index, plant)| {
            plant.pre_order_iter()
                .map(move |root| (RootRef::new(plant_index, root.index()), root))
        })
    }

    /// Returns the first root (in [Snapshot::roots] order) with identifier `id`.
    pub fn root_by_id(&self, id: &str) -> Option<&Root> {
        self.plants().iter().find_map(|plant| plant.root_by_id(id))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.plants().iter().any(|plant| plant.contains_id(id))
    }

    /// Overwrites the identifier of the root at `root_ref`.
    ///
    /// # Panics
    /// Panics if `root_ref` does not address a root of this snapshot.
    pub fn set_root_id(&mut self, root_ref: RootRef, id: impl Into<String>) {
        self.scene.plants_mut()[root_ref.plant].set_root_id(root_ref.root, id);
    }

    /// Multiplies every root coordinate by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for plant in self.scene.plants_mut() {
            plant.scale(factor);
        }
    }
}
