//! Configurable RSML parser turning a markup tree into a [Snapshot].

use crate::model::{
    Annotation, Function, Geometry, Metadata, Plant, Point, Polyline, Property,
    PropertyDefinition, Root, RootIndex, Scene, SchemaVariant, Snapshot,
};
use crate::parser::date::extract_date;
use crate::parser::xml::{self, XmlElement};
use crate::parser::ParsingError;
use crate::rsml::defs::*;
use chrono::Local;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};


// =#========================================================================#=
// RSML PARSER
// =#========================================================================#=
/// Parser for RSML documents.
///
/// Both schema variants (plain 2-D and 2-D+T) are recognized once per
/// document and normalized into the same [Snapshot] model.
///
/// Roots are read depth-first in document order: roots directly below a
/// `<plant>` get order 1, each nested `<root>` the order of its parent plus
/// one. A root whose identifier was already read earlier in the same
/// document is skipped together with its subtree.
///
/// # Example
/// ```
/// use rsmltrack::rsml::RsmlParser;
///
/// let text = r#"<rsml><metadata><version>1</version></metadata>
///   <scene><plant ID="1"><root ID="1.1" label="root">
///     <geometry><polyline><point x="0" y="0"/><point x="0" y="5"/></polyline></geometry>
///   </root></plant></scene></rsml>"#;
///
/// let snapshot = RsmlParser::new().parse_str(text, "plate_01_01_2020").unwrap();
/// assert_eq!(snapshot.num_roots(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RsmlParser {
    trim_functions: bool,
}

impl Default for RsmlParser {
    fn default() -> Self {
        Self { trim_functions: true }
    }
}

// ============================================================================
// Configuration (pub)
// ============================================================================
impl RsmlParser {
    /// Creates a parser with default configuration (function trimming on).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether every root's function list is cut to the smallest
    /// function count of its plant.
    pub fn with_function_trimming(mut self, trim: bool) -> Self {
        self.trim_functions = trim;
        self
    }
}

// ============================================================================
// Parsing (pub)
// ============================================================================
impl RsmlParser {
    /// Reads and parses the RSML file at `path`.
    ///
    /// # Arguments
    /// * `path` - File to read
    /// * `key` - Logical key of the time point the file belongs to
    ///
    /// # Errors
    /// Returns a [ParsingError] if the file cannot be read, is not
    /// well-formed XML, lacks metadata or scene, has a root without points
    /// or contains a malformed number.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P, key: &str) -> Result<Snapshot, ParsingError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| ParsingError::from(error).in_file(path))?;
        let document = xml::parse_str(&text).map_err(|error| error.in_file(path))?;

        self.parse_document(&document, key)
            .map(|snapshot| snapshot.with_source(path))
            .map_err(|error| error.in_file(path))
    }

    /// Parses RSML text; see [RsmlParser::parse_file].
    pub fn parse_str(&self, text: &str, key: &str) -> Result<Snapshot, ParsingError> {
        let document = xml::parse_str(text)?;
        self.parse_document(&document, key)
    }

    /// Parses an already loaded markup tree; see [RsmlParser::parse_file].
    pub fn parse_document(&self, document: &XmlElement, key: &str) -> Result<Snapshot, ParsingError> {
        let metadata_element = find_first(document, METADATA)
            .ok_or_else(|| ParsingError::missing_element(METADATA, format!("key `{key}`")))?;
        let scene_element = find_first(document, SCENE)
            .ok_or_else(|| ParsingError::missing_element(SCENE, format!("key `{key}`")))?;

        let schema = detect_schema(document, metadata_element);
        let metadata = parse_metadata(metadata_element, schema)?;

        let mut seen_ids = HashSet::new();
        let plants = scene_element.children_named(PLANT)
            .map(|plant| self.parse_plant(plant, &mut seen_ids))
            .collect::<Result<Vec<_>, _>>()?;

        let snapshot = Snapshot::new(metadata, Scene::new(plants)).with_key(key);
        debug!(key, roots = snapshot.num_roots(), ?schema, "parsed snapshot");
        Ok(snapshot)
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl RsmlParser {
    /// Reads all roots of a plant with an explicit worklist, in document
    /// order. `seen_ids` spans the whole document.
    fn parse_plant(&self, element: &XmlElement, seen_ids: &mut HashSet<String>) -> Result<Plant, ParsingError> {
        let mut plant = Plant::new(
            element.attribute(ATTR_ID).unwrap_or_default(),
            element.attribute(ATTR_LABEL).unwrap_or_default(),
        );

        let mut worklist: Vec<(&XmlElement, Option<RootIndex>)> = element.children_named(ROOT)
            .map(|root| (root, None))
            .collect();
        worklist.reverse();

        while let Some((root_element, parent)) = worklist.pop() {
            let id = root_element.attribute(ATTR_ID).unwrap_or_default();
            if !seen_ids.insert(id.to_string()) {
                warn!(id, plant = plant.id(), "skipping root with repeated identifier");
                continue;
            }

            let index = plant.add_root(parent, parse_root(root_element, id)?);

            let first_child_position = worklist.len();
            worklist.extend(root_element.children_named(ROOT).map(|child| (child, Some(index))));
            worklist[first_child_position..].reverse();
        }

        if self.trim_functions {
            plant.trim_functions();
        }

        Ok(plant)
    }
}

/// Returns `element` itself or its first descendant called `name`.
fn find_first<'a>(element: &'a XmlElement, name: &str) -> Option<&'a XmlElement> {
    if element.name() == name {
        return Some(element);
    }
    element.descendants().find(|descendant| descendant.name() == name)
}

fn detect_schema(document: &XmlElement, metadata: &XmlElement) -> SchemaVariant {
    let timed_points = document.descendants_named(POINT)
        .any(|point| point.attribute(ATTR_COORD_X).is_some());

    if timed_points || metadata.child(OBSERVATION_HOURS).is_some() {
        SchemaVariant::Rsml2DT
    } else {
        SchemaVariant::Rsml2D
    }
}

fn parse_number(text: &str, field: &str, context: &str) -> Result<f64, ParsingError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ParsingError::invalid_number(field, text, context))
}

fn parse_metadata(element: &XmlElement, schema: SchemaVariant) -> Result<Metadata, ParsingError> {
    let text_of = |name: &str| element.child_text(name).unwrap_or_default();

    let mut metadata = Metadata {
        unit: text_of(UNIT),
        software: text_of(SOFTWARE),
        user: text_of(USER),
        file_key: text_of(FILE_KEY),
        schema,
        ..Metadata::default()
    };

    if let Some(version) = element.child_text(VERSION) {
        metadata.version = parse_number(&version, VERSION, METADATA)?;
    }

    // 2-D+T files call the pixel size `size`
    let resolution = element.child_text(RESOLUTION).or_else(|| element.child_text(SIZE));
    if let Some(resolution) = resolution {
        metadata.resolution = parse_number(&resolution, RESOLUTION, METADATA)?;
    }

    metadata.last_modified = element.child_text(LAST_MODIFIED).and_then(|text| {
        if text.eq_ignore_ascii_case(TODAY) {
            Some(Local::now().naive_local())
        } else {
            extract_date(&text)
        }
    });

    if let Some(image) = element.child(IMAGE) {
        metadata.image_label = image.child_text(ATTR_LABEL);
        metadata.image_sha256 = image.child_text(SHA256);
    }

    if let Some(hours) = element.child_text(OBSERVATION_HOURS) {
        metadata.observation_hours = parse_observation_hours(&hours)?;
    }

    if let Some(definitions) = element.child(PROPERTY_DEFINITIONS) {
        metadata.property_definitions = definitions.children_named(PROPERTY_DEFINITION)
            .map(|definition| PropertyDefinition {
                label: definition.child_text(ATTR_LABEL).unwrap_or_default(),
                kind: definition.child_text(TYPE).unwrap_or_default(),
                unit: definition.child_text(UNIT).unwrap_or_default(),
            })
            .collect();
    }

    Ok(metadata)
}

/// Parses comma-separated hours, making sure the series starts at `0.0`.
fn parse_observation_hours(text: &str) -> Result<Vec<f64>, ParsingError> {
    let mut hours = vec![0.0];
    for value in text.split(',').map(str::trim).filter(|value| !value.is_empty()) {
        hours.push(parse_number(value, OBSERVATION_HOURS, METADATA)?);
    }

    if hours.get(1) == Some(&0.0) {
        hours.remove(0);
    }

    Ok(hours)
}

fn parse_root(element: &XmlElement, id: &str) -> Result<Root, ParsingError> {
    let context = format!("root `{id}`");

    let geometry = parse_geometry(element, &context)?;
    if geometry.is_empty() {
        return Err(ParsingError::empty_geometry(id));
    }

    let root = Root::new(id, element.attribute(ATTR_LABEL).unwrap_or_default(), geometry)
        .with_accession(element.attribute(ATTR_ACCESSION).unwrap_or_default())
        .with_properties(parse_properties(element, &context)?)
        .with_functions(parse_functions(element, &context)?)
        .with_annotations(parse_annotations(element));

    Ok(root)
}

fn parse_geometry(element: &XmlElement, context: &str) -> Result<Geometry, ParsingError> {
    let Some(geometry) = element.child(GEOMETRY) else {
        return Ok(Geometry::default());
    };

    let mut polylines = Vec::new();
    for polyline_element in geometry.children_named(POLYLINE) {
        let mut polyline = Polyline::default();
        for point in polyline_element.children_named(POINT) {
            polyline.push(parse_point(point, context)?);
        }
        polylines.push(polyline);
    }

    Ok(Geometry::new(polylines))
}

/// Reads `x`/`y`, falling back to the 2-D+T `coord_x`/`coord_y`.
fn parse_point(element: &XmlElement, context: &str) -> Result<Point, ParsingError> {
    let coordinate = |plain: &str, timed: &str| {
        let text = element.attribute(plain).or_else(|| element.attribute(timed)).unwrap_or_default();
        parse_number(text, plain, context)
    };

    Ok(Point::new(coordinate(ATTR_X, ATTR_COORD_X)?, coordinate(ATTR_Y, ATTR_COORD_Y)?))
}

/// Each child of `<properties>` is one property, named after the element.
fn parse_properties(element: &XmlElement, context: &str) -> Result<Vec<Property>, ParsingError> {
    let Some(properties) = element.child(PROPERTIES) else {
        return Ok(Vec::new());
    };

    properties.elements()
        .map(|property| -> Result<Property, ParsingError> {
            let text = property.text();
            let value = if text.is_empty() {
                property.attribute("value").unwrap_or_default().to_string()
            } else {
                text
            };
            Ok(Property::new(property.name(), parse_number(&value, property.name(), context)?))
        })
        .collect()
}

fn parse_functions(element: &XmlElement, context: &str) -> Result<Vec<Function>, ParsingError> {
    let Some(functions) = element.child(FUNCTIONS) else {
        return Ok(Vec::new());
    };

    functions.children_named(FUNCTION)
        .map(|function| -> Result<Function, ParsingError> {
            let name = function.attribute(ATTR_NAME).unwrap_or_default();
            let samples = function.children_named(SAMPLE)
                .map(|sample| parse_number(&sample.text(), name, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Function::new(name, samples))
        })
        .collect()
}

fn parse_annotations(element: &XmlElement) -> Vec<Annotation> {
    let Some(annotations) = element.child(ANNOTATIONS) else {
        return Vec::new();
    };

    annotations.children_named(ANNOTATION)
        .map(|annotation_element| {
            let mut annotation = Annotation::new(annotation_element.attribute(ATTR_NAME).unwrap_or_default());
            for child in annotation_element.elements() {
                if child.name() == POINT {
                    let x = child.attribute(ATTR_X).unwrap_or_default();
                    let y = child.attribute(ATTR_Y).unwrap_or_default();
                    annotation.attributes.insert(ANNOTATION_POINT_X.to_string(), x.to_string());
                    annotation.attributes.insert(ANNOTATION_POINT_Y.to_string(), y.to_string());
                } else {
                    annotation.attributes.insert(child.name().to_string(), child.text());
                }
            }
            annotation
        })
        .collect()
}
