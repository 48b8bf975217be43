// Document structure
pub(crate) const RSML: &str = "rsml";

pub(crate) const METADATA: &str = "metadata";

pub(crate) const SCENE: &str = "scene";

pub(crate) const PLANT: &str = "plant";

pub(crate) const ROOT: &str = "root";

// Root content
pub(crate) const PROPERTIES: &str = "properties";

pub(crate) const GEOMETRY: &str = "geometry";

pub(crate) const POLYLINE: &str = "polyline";

pub(crate) const POINT: &str = "point";

pub(crate) const FUNCTIONS: &str = "functions";

pub(crate) const FUNCTION: &str = "function";

pub(crate) const SAMPLE: &str = "sample";

pub(crate) const ANNOTATIONS: &str = "annotations";

pub(crate) const ANNOTATION: &str = "annotation";

// Metadata content
pub(crate) const VERSION: &str = "version";

pub(crate) const UNIT: &str = "unit";

pub(crate) const RESOLUTION: &str = "resolution";

pub(crate) const SIZE: &str = "size";

pub(crate) const LAST_MODIFIED: &str = "last-modified";

pub(crate) const SOFTWARE: &str = "software";

pub(crate) const USER: &str = "user";

pub(crate) const FILE_KEY: &str = "file-key";

pub(crate) const PROPERTY_DEFINITIONS: &str = "property-definitions";

pub(crate) const PROPERTY_DEFINITION: &str = "property-definition";

pub(crate) const TYPE: &str = "type";

pub(crate) const IMAGE: &str = "image";

pub(crate) const SHA256: &str = "sha256";

pub(crate) const OBSERVATION_HOURS: &str = "observation-hours";

/// `last-modified` value meaning "at parse time"
pub(crate) const TODAY: &str = "today";

// Attributes
pub(crate) const ATTR_ID: &str = "ID";

pub(crate) const ATTR_LABEL: &str = "label";

pub(crate) const ATTR_ACCESSION: &str = "po:accession";

pub(crate) const ATTR_NAME: &str = "name";

pub(crate) const ATTR_X: &str = "x";

pub(crate) const ATTR_Y: &str = "y";

pub(crate) const ATTR_COORD_X: &str = "coord_x";

pub(crate) const ATTR_COORD_Y: &str = "coord_y";

/// Annotation attributes holding an embedded point
pub(crate) const ANNOTATION_POINT_X: &str = "point_x";

pub(crate) const ANNOTATION_POINT_Y: &str = "point_y";

/// Namespace of the `po:` accession prefix
pub(crate) const PO_NAMESPACE: &str = "http://www.plantontology.org/xml-dtd/po.dtd";
