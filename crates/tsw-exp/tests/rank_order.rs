use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use tsw_exp::{
    compare_records, generate_configurations, rank_records, render_summary, write_csv,
    MeasurementRecord, Metrics, SweepAxis, SweepError,
};

fn records(rows: &[(u64, f64, f64, f64)]) -> Vec<MeasurementRecord> {
    let workers: Vec<u64> = rows.iter().map(|row| row.0).collect();
    let axes = vec![
        SweepAxis::integers("workers", "--thumb-workers", &workers).expect("axis"),
        SweepAxis::toggle("nv_offload", "--thumb-nv-offload", false).expect("axis"),
    ];
    let configs = generate_configurations(&axes, None).expect("configs");
    configs
        .into_iter()
        .zip(rows)
        .map(|(configuration, (workers, visible, elapsed, fps))| MeasurementRecord {
            configuration,
            metrics: Metrics {
                thumb_visible_ms: *visible,
                elapsed_ms: *elapsed,
                files_per_sec: *fps,
                ..Metrics::default()
            },
            report_path: PathBuf::from(format!("scan-{workers}.json")),
        })
        .collect()
}

fn order(records: &[MeasurementRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.configuration.label())
        .collect()
}

#[test]
fn visible_then_elapsed_then_throughput() {
    let mut rows = records(&[
        (2, 300.0, 900.0, 100.0),
        (4, 200.0, 1200.0, 80.0),
        (6, 200.0, 1000.0, 50.0),
        (8, 200.0, 1000.0, 70.0),
    ]);
    rank_records(&mut rows);
    assert_eq!(
        order(&rows),
        vec![
            "workers=8 nv_offload=false",
            "workers=6 nv_offload=false",
            "workers=4 nv_offload=false",
            "workers=2 nv_offload=false",
        ]
    );
}

#[test]
fn higher_throughput_ranks_first_on_ties() {
    let rows = records(&[(2, 10.0, 10.0, 5.0), (4, 10.0, 10.0, 9.0)]);
    assert_eq!(compare_records(&rows[1], &rows[0]), Ordering::Less);
    assert_eq!(compare_records(&rows[0], &rows[0]), Ordering::Equal);
}

#[test]
fn ranking_twice_is_a_no_op() {
    let mut rows = records(&[
        (1, 5.0, 5.0, 5.0),
        (2, 5.0, 5.0, 5.0),
        (3, 1.0, 9.0, 1.0),
        (4, 5.0, 4.0, 5.0),
    ]);
    rank_records(&mut rows);
    let once = rows.clone();
    rank_records(&mut rows);
    assert_eq!(rows, once);
    assert!(rows
        .windows(2)
        .all(|pair| compare_records(&pair[0], &pair[1]) != Ordering::Greater));
}

#[test]
fn csv_has_stable_header_and_rank_order() {
    let dir = tempdir().expect("dir");
    let mut rows = records(&[(2, 30.0, 100.0, 1.0), (4, 10.0, 100.0, 1.0)]);
    rank_records(&mut rows);
    let path = dir.path().join("sweep.csv");
    write_csv(&path, &rows).expect("csv");
    let text = fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "workers,nv_offload,elapsed_ms,thumb_visible_ms,thumb_end_to_end_p95_ms,\
         thumb_worker_p95_ms,thumb_decode_p95_ms,thumb_resize_p95_ms,thumb_encode_p95_ms,\
         files_per_sec,report_path"
    );
    assert_eq!(lines[1], "4,false,100,10,0,0,0,0,0,1,scan-4.json");
    assert_eq!(lines[2], "2,false,100,30,0,0,0,0,0,1,scan-2.json");
    assert_eq!(lines.len(), 3);
}

#[test]
fn empty_table_is_refused() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sweep.csv");
    let err = write_csv(&path, &[]).unwrap_err();
    assert!(matches!(err, SweepError::EmptyResultSet(_)));
    assert!(!path.exists());
}

#[test]
fn summary_lists_at_most_five_and_the_best() {
    let mut rows = records(&[
        (1, 60.0, 1.0, 1.0),
        (2, 50.0, 1.0, 1.0),
        (3, 40.0, 1.0, 1.0),
        (4, 30.0, 1.0, 1.0),
        (5, 20.0, 1.0, 1.0),
        (6, 10.0, 1.0, 1.0),
    ]);
    rank_records(&mut rows);
    let text = render_summary(&rows, Path::new("out/sweep.csv"));
    assert_eq!(text.matches("files_per_sec=").count(), 5);
    assert!(!text.contains(" workers=1 nv_offload=false visible_ms"));
    assert!(text.contains("Best config:\n workers=6 nv_offload=false\n"));
    assert!(text.contains(" visible_ms=10.0 elapsed_ms=1.0\n"));
    assert!(text.contains(" report=scan-6.json\n"));
    assert!(text.ends_with(" csv=out/sweep.csv\n"));
}
