//! Per-snapshot provenance read from the RSML `<metadata>` block.

use chrono::NaiveDateTime;

/// Layout of an RSML file; detected once on load and normalized away.
///
/// - `Rsml2D`: `point@x,y`, `metadata/resolution`
/// - `Rsml2DT`: `point@coord_x,coord_y,coord_t`, `metadata/size`
///   and `metadata/observation-hours`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    #[default]
    Rsml2D,
    Rsml2DT,
}

/// Descriptor of a property or function declared in the metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyDefinition {
    pub label: String,
    pub kind: String,
    pub unit: String,
}

/// Metadata of one snapshot.
///
/// Missing fields stay at their defaults; only malformed numbers are errors.
/// `image_label` names the source image and is the authoritative place for
/// the acquisition date of the snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub version: f64,
    pub unit: String,
    pub resolution: f64,
    /// `None` if absent or unparsable; `today` resolves to the parse instant.
    pub last_modified: Option<NaiveDateTime>,
    pub software: String,
    pub user: String,
    pub file_key: String,
    pub image_label: Option<String>,
    pub image_sha256: Option<String>,
    /// Hours since the first observation; starts with `0.0` when present.
    pub observation_hours: Vec<f64>,
    pub property_definitions: Vec<PropertyDefinition>,
    pub schema: SchemaVariant,
}
