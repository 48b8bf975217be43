#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsmltrack::model::{Geometry, Metadata, Plant, Point, Root, RootRef, Scene, Snapshot, SnapshotSeries};
use rsmltrack::rsml::to_rsml_string;
use std::fs;
use std::path::{Path, PathBuf};

// --- ROOT SPECS ---
/// Root to be placed in a test snapshot, with its nested laterals.
#[derive(Debug, Clone)]
pub struct RootSpec {
    pub id: String,
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub children: Vec<RootSpec>,
}

impl RootSpec {
    pub fn new(id: &str, label: &str, points: Vec<(f64, f64)>) -> Self {
        Self { id: id.to_string(), label: label.to_string(), points, children: Vec::new() }
    }

    pub fn primary(id: &str, points: Vec<(f64, f64)>) -> Self {
        Self::new(id, "root", points)
    }

    pub fn lateral(id: &str, points: Vec<(f64, f64)>) -> Self {
        Self::new(id, "lat", points)
    }

    pub fn with_child(mut self, child: RootSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// Builds a one-plant snapshot; the specs are attached directly to the plant.
pub fn snapshot(key: &str, roots: Vec<RootSpec>) -> Snapshot {
    fn add(plant: &mut Plant, parent: Option<usize>, spec: RootSpec) {
        let geometry = Geometry::from_points(spec.points.iter().map(|&(x, y)| Point::new(x, y)).collect());
        let index = plant.add_root(parent, Root::new(spec.id, spec.label, geometry));
        for child in spec.children {
            add(plant, Some(index), child);
        }
    }

    let mut plant = Plant::new("1", "plant_1");
    for spec in roots {
        add(&mut plant, None, spec);
    }
    Snapshot::new(Metadata::default(), Scene::new(vec![plant])).with_key(key)
}

/// RSML text of a one-plant snapshot.
pub fn rsml(roots: Vec<RootSpec>) -> String {
    to_rsml_string(&snapshot("fixture", roots)).unwrap()
}

/// Writes `text` to `dir/name` and returns the path.
pub fn write_candidate(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

pub fn day(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 5, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

/// Key as used in candidate file names for [day].
pub fn day_key(day: u32) -> String {
    format!("plate_{day:02}_05_2021")
}

// --- GROUND TRUTH SERIES ---
/// One growing primary `p` plus laterals `l{k}` that appear at time point
/// `k` and grow one point per time point. Identifiers are consistent.
pub fn growing_roots(time_index: usize, num_laterals: usize) -> Vec<RootSpec> {
    let primary_points = (0..=time_index + 1).map(|i| (100.0, 10.0 * i as f64)).collect();
    let mut primary = RootSpec::primary("p", primary_points);

    for k in (0..num_laterals).filter(|&k| k <= time_index) {
        let y0 = 10.0 + 20.0 * k as f64;
        let points = (0..=time_index - k + 1).map(|j| (100.0 + 5.0 * j as f64, y0 + j as f64)).collect();
        primary = primary.with_child(RootSpec::lateral(&format!("l{k}"), points));
    }

    vec![primary]
}

/// Ground truth series over days 1..=`num_time_points`.
pub fn growing_series(num_time_points: usize, num_laterals: usize) -> SnapshotSeries {
    (0..num_time_points)
        .map(|t| {
            let day_of_month = t as u32 + 1;
            (day(day_of_month), snapshot(&day_key(day_of_month), growing_roots(t, num_laterals)))
        })
        .collect()
}

/// Renames a random `fraction` of the roots of every non-final time point
/// to fresh identifiers; the final time point is left untouched.
pub fn scramble_ids(series: &SnapshotSeries, fraction: f64, seed: u64) -> SnapshotSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scrambled = series.clone();
    let num_time_points = scrambled.len();

    for (time_index, snapshot) in scrambled.values_mut().enumerate().take(num_time_points - 1) {
        let refs: Vec<RootRef> = snapshot.roots().map(|(root_ref, _)| root_ref).collect();
        for (n, root_ref) in refs.into_iter().enumerate() {
            if rng.gen_bool(fraction) {
                snapshot.set_root_id(root_ref, format!("scrambled_{time_index}_{n}"));
            }
        }
    }

    scrambled
}

/// Identifiers of a snapshot in pre-order.
pub fn ids(snapshot: &Snapshot) -> Vec<String> {
    snapshot.roots().map(|(_, root)| root.id().to_string()).collect()
}
