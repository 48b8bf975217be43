use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use rsmltrack::model::{Geometry, Metadata, Plant, Point, Root, Scene, Snapshot, SnapshotSeries};
use rsmltrack::rsml::{parse_str, to_rsml_string};
use rsmltrack::tracking::{IdentityResolver, MatchingMetric, dtw};
use std::hint::black_box;

const SERIES_SIZES: &[(&str, usize, usize)] = &[
    ("T10-L20", 10, 20),
    ("T30-L60", 30, 60),
];

fn polyline(num_points: usize, x0: f64, y0: f64) -> Vec<Point> {
    (0..num_points).map(|i| Point::new(x0 + 3.0 * i as f64, y0 + (i as f64 * 0.3).sin() * 10.0)).collect()
}

/// Growing series where every root is renamed at every time point but the last.
fn renamed_series(num_time_points: usize, num_laterals: usize) -> SnapshotSeries {
    (0..num_time_points)
        .map(|t| {
            let renamed = t + 1 < num_time_points;
            let id = |name: String| if renamed { format!("{name}_{t}") } else { name };

            let mut plant = Plant::new("1", "plant_1");
            let primary_points = (0..t + 2).map(|i| Point::new(500.0, 10.0 * i as f64)).collect();
            let primary = plant.add_root(None, Root::new(id("p".to_string()), "root", Geometry::from_points(primary_points)));
            for k in (0..num_laterals).filter(|&k| k <= t) {
                let points = polyline(t - k + 2, 500.0, 10.0 + 15.0 * k as f64);
                plant.add_root(Some(primary), Root::new(id(format!("l{k}")), "lat", Geometry::from_points(points)));
            }

            let time = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
                + chrono::Duration::days(t as i64);
            (time, Snapshot::new(Metadata::default(), Scene::new(vec![plant])).with_key(format!("day_{t}")))
        })
        .collect()
}

fn dtw_distance(c: &mut Criterion) {
    for num_points in [50, 500] {
        let a = polyline(num_points, 0.0, 0.0);
        let b = polyline(num_points + 7, 2.0, 1.0);
        c.bench_function(&format!("dtw-{num_points}"), |bencher| {
            bencher.iter(|| dtw(black_box(&a), black_box(&b)));
        });
    }
}

fn rsml_parsing(c: &mut Criterion) {
    let series = renamed_series(30, 60);
    let text = series.values().last().map(|snapshot| to_rsml_string(snapshot).unwrap()).unwrap();
    c.bench_function("parse-rsml-L60", |bencher| {
        bencher.iter(|| parse_str(black_box(&text), "bench").unwrap());
    });
}

fn reconciliation(c: &mut Criterion) {
    for (name, num_time_points, num_laterals) in SERIES_SIZES {
        let series = renamed_series(*num_time_points, *num_laterals);
        for metric in [MatchingMetric::Dtw, MatchingMetric::CLUSTER] {
            let resolver = IdentityResolver::new().with_metric(metric);
            c.bench_function(&format!("reconcile-{metric}-{name}"), |bencher| {
                bencher.iter_batched(
                    || series.clone(),
                    |mut series| resolver.reconcile(&mut series).unwrap(),
                    criterion::BatchSize::LargeInput,
                );
            });
        }
    }
}

criterion_group!(regression, dtw_distance, rsml_parsing);
criterion_group! {
    name = reporting;
    config = Criterion::default().sample_size(10);
    targets = reconciliation
}
criterion_main!(regression, reporting);
