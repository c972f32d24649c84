use std::path::PathBuf;

use criterion::{criterion_group, criterion_main, Criterion};
use tsw_exp::{
    generate_configurations, rank_records, MeasurementRecord, Metrics, SweepAxis, SweepPlan,
};

fn wide_plan() -> SweepPlan {
    SweepPlan {
        workers: (1..=32).collect(),
        visible: vec![12, 24, 48, 96, 192],
        include_nv_offload: true,
        ..SweepPlan::default()
    }
}

fn bench_expand(c: &mut Criterion) {
    let axes: Vec<SweepAxis> = wide_plan().axes().expect("axes");
    c.bench_function("config_space_expand", |b| {
        b.iter(|| {
            let _ = generate_configurations(&axes, None).expect("configs");
        });
    });
}

fn bench_rank(c: &mut Criterion) {
    let axes = wide_plan().axes().expect("axes");
    let records: Vec<MeasurementRecord> = generate_configurations(&axes, None)
        .expect("configs")
        .into_iter()
        .enumerate()
        .map(|(idx, configuration)| MeasurementRecord {
            configuration,
            metrics: Metrics {
                thumb_visible_ms: ((idx * 7919) % 613) as f64,
                elapsed_ms: ((idx * 104_729) % 1009) as f64,
                files_per_sec: (idx % 97) as f64,
                ..Metrics::default()
            },
            report_path: PathBuf::from(format!("scan-{idx}.json")),
        })
        .collect();
    c.bench_function("rank_records", |b| {
        b.iter(|| {
            let mut rows = records.clone();
            rank_records(&mut rows);
        });
    });
}

criterion_group!(benches, bench_expand, bench_rank);
criterion_main!(benches);
