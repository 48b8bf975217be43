//! Root module: a single organ of the root system plus its attached data.

use crate::model::geometry::{Geometry, Point};
use std::collections::BTreeMap;

/// Index of a root in its plant (arena).
pub type RootIndex = usize;

/// Branching order of primary (seed) roots.
pub const PRIMARY_ORDER: u32 = 1;


// =#========================================================================#=
// ATTACHED DATA
// =#========================================================================#=
/// Named scalar measurement of a root, e.g. `length` or `diameter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: f64,
}

impl Property {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value }
    }
}

/// Named track of samples along a root or over time, e.g. a diameter profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub samples: Vec<f64>,
}

impl Function {
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self { name: name.into(), samples }
    }
}

/// Free-form marker with string attributes.
///
/// An embedded point is stored as `point_x`/`point_y` attributes,
/// see [Annotation::point].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: BTreeMap::new() }
    }

    /// Returns the attribute value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns the embedded point, if both coordinates are present and numeric.
    pub fn point(&self) -> Option<Point> {
        let x = self.get("point_x")?.trim().parse().ok()?;
        let y = self.get("point_y")?.trim().parse().ok()?;
        Some(Point::new(x, y))
    }
}


// =#========================================================================#=
// ROOT KIND
// =#========================================================================#=
/// Role of a root as indicated by its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// Label mentions a lateral, e.g. `lat`, `lateral_root`.
    Lateral,
    /// Label mentions a primary/seed root, e.g. `root`, `primary`.
    Primary,
    Unknown,
}

impl RootKind {
    /// Classifies a label, case-insensitive. Lateral wins over primary,
    /// so `"lateral root"` is a lateral.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("lat") {
            RootKind::Lateral
        } else if label.contains("root") || label.contains("prim") {
            RootKind::Primary
        } else {
            RootKind::Unknown
        }
    }
}


// =#========================================================================#=
// ROOT
// =#========================================================================#=
/// A root of a plant, stored in the arena of its [Plant](crate::model::plant::Plant).
///
/// Parent and children are referenced by [RootIndex] into the same arena,
/// never by reference. The branching `order` is `1` for roots attached to
/// the plant and the parent's order plus one otherwise; the owning plant
/// assigns it on insertion.
///
/// All fields except the identifier are fixed once the snapshot is parsed.
/// The identifier is rewritten during identity reconciliation,
/// see [Plant::set_root_id](crate::model::plant::Plant::set_root_id).
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub(crate) index: RootIndex,
    pub(crate) id: String,
    label: String,
    accession: String,
    pub(crate) order: u32,
    geometry: Geometry,
    properties: Vec<Property>,
    pub(crate) functions: Vec<Function>,
    annotations: Vec<Annotation>,
    pub(crate) parent: Option<RootIndex>,
    pub(crate) children: Vec<RootIndex>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Root {
    /// Creates a detached root; index, order and parent are set when added to a plant.
    pub fn new(id: impl Into<String>, label: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            index: 0,
            id: id.into(),
            label: label.into(),
            accession: String::new(),
            order: PRIMARY_ORDER,
            geometry,
            properties: Vec::new(),
            functions: Vec::new(),
            annotations: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Attaches an ontology accession, e.g. `PO:0020127`.
    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = accession.into();
        self
    }

    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_functions(mut self, functions: Vec<Function>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn index(&self) -> RootIndex {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> RootKind {
        RootKind::from_label(&self.label)
    }

    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// Branching order; 1 for primary roots.
    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Returns the value of the property `name`, if present.
    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.iter()
            .find(|property| property.name == name)
            .map(|property| property.value)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn parent(&self) -> Option<RootIndex> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn children(&self) -> &[RootIndex] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn is_primary(&self) -> bool {
        self.order == PRIMARY_ORDER
    }
}
