mod common;

use common::{day, rsml, write_candidate, RootSpec};
use rsmltrack::selection::{
    resolve_directory, CandidateResolver, DropReason, SelectionStrategy, StructuralIssue, ALL_STRATEGIES,
};
use std::fs;
use std::time::{Duration, SystemTime};

fn lateral(id: &str, y: f64) -> RootSpec {
    RootSpec::lateral(id, vec![(0.0, y), (5.0, y + 1.0)])
}

fn primary_with_laterals(num_laterals: usize) -> RootSpec {
    (0..num_laterals).fold(
        RootSpec::primary("p", vec![(0.0, 0.0), (0.0, 50.0)]),
        |primary, k| primary.with_child(lateral(&format!("l{k}"), 5.0 + 10.0 * k as f64)),
    )
}

// --- TESTS SELECTION SCENARIOS ---
#[test]
fn test_most_organs_selects_larger_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let five_roots = write_candidate(dir.path(), "plate_17_05_2021.rsml01", &rsml(vec![primary_with_laterals(4)]));
    write_candidate(dir.path(), "plate_17_05_2021.rsml02", &rsml(vec![primary_with_laterals(2)]));

    let resolution = CandidateResolver::for_directory(dir.path())
        .unwrap()
        .with_strategy(SelectionStrategy::MostOrgans)
        .resolve()
        .unwrap();

    assert_eq!(resolution.selected.len(), 1);
    let selected = &resolution.selected["plate_17_05_2021"];
    assert_eq!(selected.candidate.path(), five_roots.as_path());
    assert!(!selected.repaired);
    assert!(resolution.dropped.is_empty());
}

#[test]
fn test_version_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let text = rsml(vec![primary_with_laterals(1)]);
    let first = write_candidate(dir.path(), "plate_17_05_2021.rsml", &text);
    write_candidate(dir.path(), "plate_17_05_2021.rsml01", &text);
    let last = write_candidate(dir.path(), "plate_17_05_2021.rsml07", &text);

    let resolve = |strategy| {
        CandidateResolver::for_directory(dir.path())
            .unwrap()
            .with_strategy(strategy)
            .resolve()
            .unwrap()
            .selected["plate_17_05_2021"]
            .candidate
            .path()
            .to_path_buf()
    };

    assert_eq!(resolve(SelectionStrategy::LastVersion), last);
    assert_eq!(resolve(SelectionStrategy::FirstVersion), first);
    // Identical content: the default strategy ties and falls back to last version
    assert_eq!(resolve(SelectionStrategy::MostComplexity), last);
}

#[test]
fn test_lateral_under_plant_is_repaired_and_selected() {
    let dir = tempfile::tempdir().unwrap();
    write_candidate(dir.path(), "plate_18_05_2021.rsml01", &rsml(vec![RootSpec::primary("p", vec![(0.0, 0.0), (0.0, 50.0)])]));

    // Laterals written next to the primary, i.e. directly below the plant
    let broken_text = rsml(vec![
        RootSpec::primary("p", vec![(0.0, 0.0), (0.0, 50.0)]),
        lateral("l0", 5.0),
        lateral("l1", 15.0),
    ]);
    let broken = write_candidate(dir.path(), "plate_18_05_2021.rsml02", &broken_text);

    let resolution = resolve_directory(dir.path()).unwrap();
    let selected = &resolution.selected["plate_18_05_2021"];

    let corrected = dir.path().join("plate_18_05_2021_corrected.rsml02");
    assert!(selected.repaired);
    assert_eq!(selected.candidate.path(), corrected.as_path());
    assert_eq!(resolution.repaired, vec![corrected.clone()]);
    assert!(corrected.is_file());

    // Original untouched
    assert_eq!(fs::read_to_string(&broken).unwrap(), broken_text);

    // Repaired content parses with laterals below the primary
    let snapshot = rsmltrack::rsml::parse_file(&corrected, "plate_18_05_2021").unwrap();
    let plant = &snapshot.plants()[0];
    assert_eq!(plant.primaries().len(), 1);
    assert_eq!(plant.root_by_id("l0").unwrap().order(), 2);
    assert_eq!(plant.root_by_id("l1").unwrap().order(), 2);
}

#[test]
fn test_repair_in_memory_only() {
    let dir = tempfile::tempdir().unwrap();
    write_candidate(
        dir.path(),
        "plate_18_05_2021.rsml",
        &rsml(vec![RootSpec::primary("p", vec![(0.0, 0.0), (0.0, 50.0)]), lateral("l0", 5.0)]),
    );

    let resolution = CandidateResolver::for_directory(dir.path())
        .unwrap()
        .with_repair_output(false)
        .resolve()
        .unwrap();

    assert!(resolution.selected["plate_18_05_2021"].repaired);
    assert!(!dir.path().join("plate_18_05_2021_corrected.rsml").exists());
}

#[test]
fn test_repaired_candidate_keeps_source_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let older = write_candidate(
        dir.path(),
        "plate_18_05_2021.rsml01",
        &rsml(vec![RootSpec::primary("p", vec![(0.0, 0.0), (0.0, 50.0)]), lateral("l0", 5.0)]),
    );
    fs::File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
    let newer = write_candidate(dir.path(), "plate_18_05_2021.rsml02", &rsml(vec![primary_with_laterals(1)]));

    // In-memory first: a written repair would join the next listing
    for write_repairs in [false, true] {
        let resolution = CandidateResolver::for_directory(dir.path())
            .unwrap()
            .with_strategy(SelectionStrategy::MostRecentTimestamp)
            .with_repair_output(write_repairs)
            .resolve()
            .unwrap();

        let selected = &resolution.selected["plate_18_05_2021"];
        assert_eq!(selected.candidate.path(), newer.as_path(), "write repairs: {write_repairs}");
        assert!(!selected.repaired);
    }
}

#[test]
fn test_dot_dated_keys_stay_apart() {
    let dir = tempfile::tempdir().unwrap();
    write_candidate(dir.path(), "plate_17.05.2021.rsml", &rsml(vec![primary_with_laterals(1)]));
    write_candidate(dir.path(), "plate_17.06.2021.rsml", &rsml(vec![primary_with_laterals(2)]));

    let resolution = resolve_directory(dir.path()).unwrap();
    assert_eq!(resolution.selected.keys().collect::<Vec<_>>(), vec!["plate_17.05.2021", "plate_17.06.2021"]);
    assert!(resolution.dropped.is_empty());
}

#[test]
fn test_invalid_key_is_dropped_with_date() {
    let dir = tempfile::tempdir().unwrap();
    write_candidate(dir.path(), "plate_17_05_2021.rsml", &rsml(vec![primary_with_laterals(1)]));

    // No points at all, and two primaries with a lateral below the plant
    write_candidate(
        dir.path(),
        "plate_19_05_2021.rsml01",
        r#"<rsml><metadata/><scene><plant ID="1"><root ID="p" label="root"/></plant></scene></rsml>"#,
    );
    write_candidate(
        dir.path(),
        "plate_19_05_2021.rsml02",
        &rsml(vec![
            RootSpec::primary("p", vec![(0.0, 0.0), (0.0, 50.0)]),
            RootSpec::primary("q", vec![(9.0, 0.0), (9.0, 50.0)]),
            lateral("l0", 5.0),
        ]),
    );

    let resolution = resolve_directory(dir.path()).unwrap();

    assert_eq!(resolution.selected.keys().collect::<Vec<_>>(), vec!["plate_17_05_2021"]);
    assert_eq!(resolution.dropped.len(), 1);

    let dropped = &resolution.dropped[0];
    assert_eq!(dropped.key, "plate_19_05_2021");
    assert_eq!(dropped.date, Some(day(19)));
    let DropReason::NoValidCandidate(rejected) = &dropped.reason else {
        panic!("unexpected drop reason {:?}", dropped.reason);
    };
    assert_eq!(rejected.len(), 2);
    assert!(rejected[0].issues.contains(&StructuralIssue::MissingElement("point")));
    assert!(rejected[1].issues.contains(&StructuralIssue::LateralUnderPlant("l0".to_string())));
}

#[test]
fn test_unreadable_candidate_does_not_stop_key() {
    let dir = tempfile::tempdir().unwrap();
    write_candidate(dir.path(), "plate_17_05_2021.rsml01", "<rsml><metadata>");
    let good = write_candidate(dir.path(), "plate_17_05_2021.rsml02", &rsml(vec![primary_with_laterals(1)]));

    let resolution = resolve_directory(dir.path()).unwrap();
    assert_eq!(resolution.selected["plate_17_05_2021"].candidate.path(), good.as_path());
    assert_eq!(resolution.rejected.len(), 1);
    assert!(matches!(resolution.rejected[0].issues[0], StructuralIssue::Unreadable(_)));
}

#[test]
fn test_selection_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    for (day_of_month, revisions) in [(17, 3), (18, 2), (19, 4)] {
        for revision in 0..revisions {
            write_candidate(
                dir.path(),
                &format!("plate_{day_of_month}_05_2021.rsml{revision:02}"),
                &rsml(vec![primary_with_laterals((revision * 7 + day_of_month) % 4)]),
            );
        }
    }

    for strategy in ALL_STRATEGIES {
        let resolve = |parallel| {
            CandidateResolver::for_directory(dir.path())
                .unwrap()
                .with_strategy(strategy)
                .with_parallelism(parallel)
                .with_threads(2)
                .resolve()
                .unwrap()
                .selected
                .into_iter()
                .map(|(key, selected)| (key, selected.candidate.path().to_path_buf()))
                .collect::<Vec<_>>()
        };

        let first = resolve(true);
        assert_eq!(first.len(), 3);
        assert_eq!(resolve(true), first, "strategy {strategy}");
        assert_eq!(resolve(false), first, "strategy {strategy}");
    }
}

#[test]
fn test_missing_directory() {
    assert!(CandidateResolver::for_directory("tests/fixtures/does_not_exist").is_err());
}
