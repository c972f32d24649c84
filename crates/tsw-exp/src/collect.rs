use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tsw_core::errors::{ErrorInfo, SweepError};

use crate::axis::Configuration;

/// Metric column names, in export order.
pub const METRIC_COLUMNS: [&str; 8] = [
    "elapsed_ms",
    "thumb_visible_ms",
    "thumb_end_to_end_p95_ms",
    "thumb_worker_p95_ms",
    "thumb_decode_p95_ms",
    "thumb_resize_p95_ms",
    "thumb_encode_p95_ms",
    "files_per_sec",
];

/// Metrics read from the first result entry of a report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub elapsed_ms: f64,
    pub thumb_visible_ms: f64,
    pub thumb_end_to_end_p95_ms: f64,
    pub thumb_worker_p95_ms: f64,
    pub thumb_decode_p95_ms: f64,
    pub thumb_resize_p95_ms: f64,
    pub thumb_encode_p95_ms: f64,
    pub files_per_sec: f64,
}

impl Metrics {
    /// Values in [`METRIC_COLUMNS`] order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.elapsed_ms,
            self.thumb_visible_ms,
            self.thumb_end_to_end_p95_ms,
            self.thumb_worker_p95_ms,
            self.thumb_decode_p95_ms,
            self.thumb_resize_p95_ms,
            self.thumb_encode_p95_ms,
            self.files_per_sec,
        ]
    }
}

/// Outcome of one successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub configuration: Configuration,
    pub metrics: Metrics,
    pub report_path: PathBuf,
}

fn parse_error(code: &str, path: &Path, message: impl Into<String>) -> SweepError {
    SweepError::ReportParse(
        ErrorInfo::new(code, message).with_context("path", path.display().to_string()),
    )
}

/// Parses a report artifact into a record for `configuration`.
///
/// Missing or null metrics read as `0.0`; not every benchmark version emits
/// every field.
pub fn collect_result(
    path: &Path,
    configuration: &Configuration,
) -> Result<MeasurementRecord, SweepError> {
    let bytes =
        fs::read(path).map_err(|err| parse_error("tsw.collect.read", path, err.to_string()))?;
    let document: Value = serde_json::from_slice(&bytes)
        .map_err(|err| parse_error("tsw.collect.json", path, err.to_string()))?;
    let entry = document
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| parse_error("tsw.collect.results", path, "report has no result entries"))?;
    let Some(fields) = entry.as_object() else {
        return Err(parse_error(
            "tsw.collect.results",
            path,
            "first result entry is not an object",
        ));
    };

    let metric = |key: &str| -> Result<f64, SweepError> {
        coerce_metric(fields.get(key)).ok_or_else(|| {
            parse_error(
                "tsw.collect.metric",
                path,
                format!("field '{key}' is not numeric"),
            )
        })
    };
    let metrics = Metrics {
        elapsed_ms: metric("elapsed_ms")?,
        thumb_visible_ms: metric("thumb_time_to_visible_ms")?,
        thumb_end_to_end_p95_ms: metric("thumb_end_to_end_p95_ms")?,
        thumb_worker_p95_ms: metric("thumb_worker_p95_ms")?,
        thumb_decode_p95_ms: metric("thumb_decode_p95_ms")?,
        thumb_resize_p95_ms: metric("thumb_resize_p95_ms")?,
        thumb_encode_p95_ms: metric("thumb_encode_p95_ms")?,
        files_per_sec: metric("files_per_sec")?,
    };

    Ok(MeasurementRecord {
        configuration: configuration.clone(),
        metrics,
        report_path: path.to_path_buf(),
    })
}

fn coerce_metric(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    }
}
