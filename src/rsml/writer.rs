//! RSML writing of (reconciled) snapshots.

use crate::model::{Metadata, Plant, RootIndex, SchemaVariant, Snapshot};
use crate::parser::xml::{self, XmlElement};
use crate::parser::ParsingError;
use crate::rsml::defs::*;
use std::fs;
use std::path::Path;

/// Writes `snapshot` as RSML to the file at `path`, replacing it if it exists.
///
/// Roots carry their current identifiers, so after reconciliation the file
/// holds the corrected ones.
///
/// # Errors
/// Returns a [ParsingError] of kind `Io` if the file cannot be written.
pub fn write_rsml_file<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> Result<(), ParsingError> {
    let path = path.as_ref();
    let text = to_rsml_string(snapshot)?;
    fs::write(path, text).map_err(|error| ParsingError::from(error).in_file(path))
}

/// Returns the RSML representation of `snapshot`.
///
/// Points are written as `x`/`y` for 2-D snapshots and as
/// `coord_x`/`coord_y` for 2-D+T snapshots. Floats use their shortest
/// round-trip representation.
///
/// # Example
/// ```
/// use rsmltrack::rsml::{to_rsml_string, RsmlParser};
///
/// let text = r#"<rsml><metadata/><scene><plant ID="p"><root ID="r" label="root">
///   <geometry><polyline><point x="1" y="2"/></polyline></geometry>
/// </root></plant></scene></rsml>"#;
/// let snapshot = RsmlParser::new().parse_str(text, "key").unwrap();
///
/// let written = to_rsml_string(&snapshot).unwrap();
/// assert!(written.contains(r#"<root ID="r" label="root">"#));
/// ```
pub fn to_rsml_string(snapshot: &Snapshot) -> Result<String, ParsingError> {
    xml::to_xml_string(&to_rsml_document(snapshot))
}

/// Builds the markup tree of `snapshot`.
pub fn to_rsml_document(snapshot: &Snapshot) -> XmlElement {
    let schema = snapshot.metadata().schema;

    let scene = snapshot.plants().iter()
        .fold(XmlElement::new(SCENE), |scene, plant| scene.with_child(plant_element(plant, schema)));

    XmlElement::new(RSML)
        .with_attribute("xmlns:po", PO_NAMESPACE)
        .with_child(metadata_element(snapshot.metadata()))
        .with_child(scene)
}

fn text_element(name: &str, text: impl ToString) -> XmlElement {
    XmlElement::new(name).with_text(text.to_string())
}

fn metadata_element(metadata: &Metadata) -> XmlElement {
    let resolution_name = match metadata.schema {
        SchemaVariant::Rsml2D => RESOLUTION,
        SchemaVariant::Rsml2DT => SIZE,
    };

    let mut element = XmlElement::new(METADATA)
        .with_child(text_element(VERSION, metadata.version))
        .with_child(text_element(UNIT, &metadata.unit))
        .with_child(text_element(resolution_name, metadata.resolution));

    if let Some(last_modified) = metadata.last_modified {
        element.push_child(text_element(LAST_MODIFIED, last_modified.format("%Y-%m-%dT%H:%M:%S")));
    }

    element = element
        .with_child(text_element(SOFTWARE, &metadata.software))
        .with_child(text_element(USER, &metadata.user))
        .with_child(text_element(FILE_KEY, &metadata.file_key));

    if !metadata.property_definitions.is_empty() {
        let definitions = metadata.property_definitions.iter().fold(
            XmlElement::new(PROPERTY_DEFINITIONS),
            |definitions, definition| {
                definitions.with_child(
                    XmlElement::new(PROPERTY_DEFINITION)
                        .with_child(text_element(ATTR_LABEL, &definition.label))
                        .with_child(text_element(TYPE, &definition.kind))
                        .with_child(text_element(UNIT, &definition.unit)),
                )
            },
        );
        element.push_child(definitions);
    }

    if !metadata.observation_hours.is_empty() {
        let hours: Vec<String> = metadata.observation_hours.iter().map(f64::to_string).collect();
        element.push_child(text_element(OBSERVATION_HOURS, hours.join(",")));
    }

    if metadata.image_label.is_some() || metadata.image_sha256.is_some() {
        let mut image = XmlElement::new(IMAGE);
        if let Some(label) = &metadata.image_label {
            image.push_child(text_element(ATTR_LABEL, label));
        }
        if let Some(sha256) = &metadata.image_sha256 {
            image.push_child(text_element(SHA256, sha256));
        }
        element.push_child(image);
    }

    element
}

fn plant_element(plant: &Plant, schema: SchemaVariant) -> XmlElement {
    // Recursive helper for nesting roots below their parent
    fn root_element(plant: &Plant, index: RootIndex, schema: SchemaVariant) -> XmlElement {
        let root = &plant[index];
        let (x_name, y_name) = match schema {
            SchemaVariant::Rsml2D => (ATTR_X, ATTR_Y),
            SchemaVariant::Rsml2DT => (ATTR_COORD_X, ATTR_COORD_Y),
        };

        let mut element = XmlElement::new(ROOT)
            .with_attribute(ATTR_ID, root.id())
            .with_attribute(ATTR_LABEL, root.label());
        if !root.accession().is_empty() {
            element.set_attribute(ATTR_ACCESSION, root.accession());
        }

        if !root.properties().is_empty() {
            let properties = root.properties().iter().fold(XmlElement::new(PROPERTIES), |properties, property| {
                properties.with_child(text_element(&property.name, property.value))
            });
            element.push_child(properties);
        }

        let geometry = root.geometry().polylines().iter().fold(XmlElement::new(GEOMETRY), |geometry, polyline| {
            let polyline = polyline.points().iter().fold(XmlElement::new(POLYLINE), |polyline, point| {
                polyline.with_child(
                    XmlElement::new(POINT)
                        .with_attribute(x_name, point.x.to_string())
                        .with_attribute(y_name, point.y.to_string()),
                )
            });
            geometry.with_child(polyline)
        });
        element.push_child(geometry);

        if !root.functions().is_empty() {
            let functions = root.functions().iter().fold(XmlElement::new(FUNCTIONS), |functions, function| {
                let function_element = function.samples.iter().fold(
                    XmlElement::new(FUNCTION).with_attribute(ATTR_NAME, function.name.as_str()),
                    |function_element, sample| function_element.with_child(text_element(SAMPLE, sample)),
                );
                functions.with_child(function_element)
            });
            element.push_child(functions);
        }

        if !root.annotations().is_empty() {
            let annotations = root.annotations().iter().fold(XmlElement::new(ANNOTATIONS), |annotations, annotation| {
                let mut annotation_element = XmlElement::new(ANNOTATION).with_attribute(ATTR_NAME, annotation.name.as_str());
                if let (Some(x), Some(y)) = (annotation.get(ANNOTATION_POINT_X), annotation.get(ANNOTATION_POINT_Y)) {
                    annotation_element.push_child(XmlElement::new(POINT).with_attribute(ATTR_X, x).with_attribute(ATTR_Y, y));
                }
                for (key, value) in &annotation.attributes {
                    if key != ANNOTATION_POINT_X && key != ANNOTATION_POINT_Y {
                        annotation_element.push_child(text_element(key, value));
                    }
                }
                annotations.with_child(annotation_element)
            });
            element.push_child(annotations);
        }

        for &child in root.children() {
            element.push_child(root_element(plant, child, schema));
        }

        element
    }

    plant.primaries().iter().fold(
        XmlElement::new(PLANT)
            .with_attribute(ATTR_ID, plant.id())
            .with_attribute(ATTR_LABEL, plant.label()),
        |element, &primary| element.with_child(root_element(plant, primary, schema)),
    )
}
