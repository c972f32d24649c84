use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tsw_core::errors::{ErrorInfo, SweepError};

use crate::collect::{MeasurementRecord, METRIC_COLUMNS};

/// Number of configurations listed in the console ranking.
pub const TOP_N: usize = 5;

fn export_error(path: &Path, err: impl ToString) -> SweepError {
    SweepError::Io(
        ErrorInfo::new("tsw.export.csv", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}

/// Time to first visible result, then total elapsed time, then throughput
/// (higher first).
pub fn compare_records(a: &MeasurementRecord, b: &MeasurementRecord) -> Ordering {
    a.metrics
        .thumb_visible_ms
        .total_cmp(&b.metrics.thumb_visible_ms)
        .then(a.metrics.elapsed_ms.total_cmp(&b.metrics.elapsed_ms))
        .then(b.metrics.files_per_sec.total_cmp(&a.metrics.files_per_sec))
}

/// Stable in-place ranking; ranking an already ranked slice changes nothing.
pub fn rank_records(records: &mut [MeasurementRecord]) {
    records.sort_by(compare_records);
}

/// `sweep-<unix seconds>.csv` inside the benchmark directory.
pub fn default_output_path(bench_dir: &Path, now: DateTime<Utc>) -> PathBuf {
    bench_dir.join(format!("sweep-{}.csv", now.timestamp()))
}

/// Axis columns in axis order, then metrics, then `report_path`.
pub fn csv_header(record: &MeasurementRecord) -> Vec<String> {
    let mut header: Vec<String> = record
        .configuration
        .assignments()
        .iter()
        .map(|assignment| assignment.axis.clone())
        .collect();
    header.extend(METRIC_COLUMNS.iter().map(|column| column.to_string()));
    header.push("report_path".to_string());
    header
}

/// Writes the ranked records as CSV. Refuses to write an empty table.
pub fn write_csv(path: &Path, records: &[MeasurementRecord]) -> Result<(), SweepError> {
    let Some(first) = records.first() else {
        return Err(SweepError::EmptyResultSet(
            ErrorInfo::new("tsw.export.empty", "refusing to write an empty ranking")
                .with_context("path", path.display().to_string()),
        ));
    };
    let mut wtr = csv::Writer::from_path(path).map_err(|err| export_error(path, err))?;
    wtr.write_record(csv_header(first))
        .map_err(|err| export_error(path, err))?;
    for record in records {
        let mut row: Vec<String> = record
            .configuration
            .assignments()
            .iter()
            .map(|assignment| assignment.value.to_string())
            .collect();
        row.extend(record.metrics.values().iter().map(|value| value.to_string()));
        row.push(record.report_path.display().to_string());
        wtr.write_record(&row).map_err(|err| export_error(path, err))?;
    }
    wtr.flush().map_err(|err| export_error(path, err))
}

/// Console text: the top [`TOP_N`] configurations followed by the winner.
pub fn render_summary(records: &[MeasurementRecord], csv_path: &Path) -> String {
    let mut out = String::new();
    let Some(best) = records.first() else {
        return out;
    };
    let _ = writeln!(out, "\nTop {TOP_N} configs (by visible-ms, then elapsed):");
    for record in records.iter().take(TOP_N) {
        let metrics = &record.metrics;
        let _ = writeln!(
            out,
            " {} visible_ms={:.1} elapsed_ms={:.1} p95={:.1} files_per_sec={:.1}",
            record.configuration.label(),
            metrics.thumb_visible_ms,
            metrics.elapsed_ms,
            metrics.thumb_end_to_end_p95_ms,
            metrics.files_per_sec,
        );
    }
    let _ = writeln!(out, "\nBest config:");
    let _ = writeln!(out, " {}", best.configuration.label());
    let _ = writeln!(
        out,
        " visible_ms={:.1} elapsed_ms={:.1}",
        best.metrics.thumb_visible_ms, best.metrics.elapsed_ms
    );
    let _ = writeln!(out, " report={}", best.report_path.display());
    let _ = writeln!(out, " csv={}", csv_path.display());
    out
}
