mod common;

use approx::assert_relative_eq;
use common::{fixture, ids, RootSpec};
use rsmltrack::model::{Point, RootKind, SchemaVariant};
use rsmltrack::parser::ParsingErrorType;
use rsmltrack::rsml::{self, to_rsml_string, write_rsml_file, RsmlParser};

// --- TESTS RSML PARSING ---
#[test]
fn test_parse_fixture_structure() {
    let snapshot = rsml::parse_file(fixture("plate_17_05_2021.rsml"), "plate_17_05_2021").unwrap();

    assert_eq!(snapshot.key(), "plate_17_05_2021");
    assert_eq!(snapshot.source(), Some(&fixture("plate_17_05_2021.rsml")));
    assert_eq!(snapshot.plants().len(), 1);

    // Repeated `1.2` is skipped with its subtree
    assert_eq!(ids(&snapshot), vec!["1.1", "1.2", "1.3", "1.4"]);
    assert_eq!(snapshot.num_roots(), 4);

    let plant = &snapshot.plants()[0];
    assert!(plant.is_valid());
    assert_eq!(plant.id(), "1");
    assert_eq!(plant.label(), "plant_1");
    assert_eq!(plant.primaries().len(), 1);

    let orders: Vec<u32> = plant.pre_order_iter().map(|root| root.order()).collect();
    assert_eq!(orders, vec![1, 2, 3, 2]);

    let primary = plant.root_by_id("1.1").unwrap();
    assert!(primary.is_primary());
    assert_eq!(primary.kind(), RootKind::Primary);
    assert_eq!(primary.accession(), "PO:0009005");
    assert_eq!(primary.num_children(), 2);

    let nested = plant.root_by_id("1.3").unwrap();
    assert_eq!(nested.kind(), RootKind::Lateral);
    assert_eq!(plant[nested.parent().unwrap()].id(), "1.2");
}

#[test]
fn test_parse_fixture_root_data() {
    let snapshot = rsml::parse_file(fixture("plate_17_05_2021.rsml"), "plate_17_05_2021").unwrap();
    let primary = snapshot.root_by_id("1.1").unwrap();

    // Properties from element text and from `value` attribute
    assert_eq!(primary.property("diameter"), Some(2.5));
    assert_eq!(primary.property("length"), Some(21.1));
    assert_eq!(primary.property("angle"), None);

    // Geometry
    assert_eq!(primary.geometry().num_points(), 3);
    assert_eq!(primary.geometry().insertion_point(), Some(Point::new(10.0, 10.0)));
    assert_relative_eq!(primary.geometry().total_length(), 10.0 + 101f64.sqrt());

    // Functions trimmed to the smallest count in the plant
    assert_eq!(primary.functions().len(), 1);
    assert_eq!(primary.functions()[0].name, "diameter");
    assert_eq!(primary.functions()[0].samples, vec![2.5, 2.4, 2.2]);
    assert!(snapshot.roots().all(|(_, root)| root.functions().len() == 1));

    // Annotation with embedded point
    let annotation = &primary.annotations()[0];
    assert_eq!(annotation.name, "tip");
    assert_eq!(annotation.point(), Some(Point::new(11.0, 30.0)));
    assert_eq!(annotation.get("value"), Some("ok"));
}

#[test]
fn test_parse_fixture_metadata() {
    let snapshot = rsml::parse_file(fixture("plate_17_05_2021.rsml"), "plate_17_05_2021").unwrap();
    let metadata = snapshot.metadata();

    assert_eq!(metadata.schema, SchemaVariant::Rsml2D);
    assert_eq!(metadata.version, 1.0);
    assert_eq!(metadata.unit, "pixel");
    assert_eq!(metadata.resolution, 1.0);
    assert_eq!(metadata.software, "smartroot");
    assert_eq!(metadata.user, "lab");
    assert_eq!(metadata.file_key, "plate_17_05_2021");
    assert_eq!(metadata.last_modified.unwrap().to_string(), "2021-05-17 10:30:00");
    assert_eq!(metadata.image_label.as_deref(), Some("plate_17_05_2021.jpg"));
    assert_eq!(metadata.image_sha256.as_deref(), Some("9f2c1e"));
    assert!(metadata.observation_hours.is_empty());

    assert_eq!(metadata.property_definitions.len(), 1);
    assert_eq!(metadata.property_definitions[0].label, "diameter");
    assert_eq!(metadata.property_definitions[0].kind, "float");
}

#[test]
fn test_parse_timed_schema() {
    let snapshot = rsml::parse_file(fixture("timed_2dt.rsml"), "box").unwrap();
    let metadata = snapshot.metadata();

    assert_eq!(metadata.schema, SchemaVariant::Rsml2DT);
    assert_eq!(metadata.resolution, 0.5);
    assert_eq!(metadata.observation_hours, vec![0.0, 24.0, 48.0, 72.0]);

    assert_eq!(ids(&snapshot), vec!["1", "2"]);
    let lateral = snapshot.root_by_id("2").unwrap();
    assert_eq!(lateral.order(), 2);
    assert_eq!(lateral.geometry().tip(), Some(Point::new(120.0, 85.0)));
}

#[test]
fn test_malformed_number_fails_file() {
    let error = rsml::parse_file(fixture("malformed_number.rsml"), "bad").unwrap_err();

    assert!(matches!(error.kind(), ParsingErrorType::InvalidNumber { field, value } if field == "x" && value == "ten"));
    assert_eq!(error.path(), Some(fixture("malformed_number.rsml").as_path()));
}

#[test]
fn test_missing_sections() {
    let error = rsml::parse_str("<rsml><scene/></rsml>", "k").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::MissingElement(name) if name == "metadata"));

    // Optional sections may be absent
    let snapshot = rsml::parse_str("<rsml><metadata/><scene/></rsml>", "k").unwrap();
    assert_eq!(snapshot.num_roots(), 0);
}

#[test]
fn test_root_without_points() {
    let text = r#"<rsml><metadata/><scene><plant ID="1"><root ID="r" label="root"/></plant></scene></rsml>"#;
    let error = rsml::parse_str(text, "k").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::EmptyGeometry(id) if id == "r"));
}

#[test]
fn test_malformed_xml() {
    let error = rsml::parse_str("<rsml><metadata></rsml>", "k").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::MalformedXml(_)));
}

#[test]
fn test_function_trimming_can_be_disabled() {
    let parser = RsmlParser::new().with_function_trimming(false);
    let snapshot = parser.parse_file(fixture("plate_17_05_2021.rsml"), "plate_17_05_2021").unwrap();
    assert_eq!(snapshot.root_by_id("1.1").unwrap().functions().len(), 2);
}

// --- TESTS RSML WRITING ---
#[test]
fn test_write_and_reparse_keeps_model() {
    let original = rsml::parse_file(fixture("plate_17_05_2021.rsml"), "plate_17_05_2021").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("written.rsml");
    write_rsml_file(&path, &original).unwrap();
    let reparsed = rsml::parse_file(&path, "plate_17_05_2021").unwrap();

    assert_eq!(reparsed.metadata(), original.metadata());
    assert_eq!(reparsed.plants(), original.plants());
}

#[test]
fn test_written_ids_follow_renaming() {
    let mut snapshot = common::snapshot(
        "k",
        vec![RootSpec::primary("a", vec![(0.0, 0.0), (0.0, 1.0)])
            .with_child(RootSpec::lateral("b", vec![(0.0, 0.5), (1.0, 0.5)]))],
    );
    let lateral = snapshot.roots().find(|(_, root)| root.id() == "b").unwrap().0;
    snapshot.set_root_id(lateral, "c");

    let text = to_rsml_string(&snapshot).unwrap();
    let reparsed = rsml::parse_str(&text, "k").unwrap();
    assert_eq!(ids(&reparsed), vec!["a", "c"]);
    assert!(!reparsed.contains_id("b"));
}
