use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tsw_core::errors::{ErrorInfo, SweepError};

use crate::axis::{AxisValue, SweepAxis};
use crate::invoke::{BenchmarkCommand, SweepOptions};
use crate::locate::DEFAULT_REPORT_PATTERN;
use crate::serde::from_yaml_slice;

/// Sweep plan as read from YAML. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepPlan {
    /// Media directory handed to the benchmark.
    pub input: PathBuf,
    /// Internal repetitions per invocation.
    pub runs: usize,
    /// Values for `--thumb-workers`.
    pub workers: Vec<u64>,
    /// Values for `--thumb-visible-count`.
    pub visible: Vec<u64>,
    /// Also try `--thumb-fast-resize` (on by default).
    pub include_fast_resize: bool,
    /// Also try `--thumb-nv-offload`.
    pub include_nv_offload: bool,
    /// `0` processes every image.
    pub thumb_limit: usize,
    pub thumb_timeout_ms: u64,
    pub cold_cache: bool,
    pub gpu_telemetry: bool,
    pub gpu_sample_ms: u64,
    /// `0` keeps every configuration.
    pub max_configs: usize,
    /// CSV destination; auto-named inside `bench_dir` when absent.
    pub output: Option<PathBuf>,
    pub command: BenchmarkCommand,
    /// Directory the benchmark runs in.
    pub workdir: PathBuf,
    /// Where reports appear; `<workdir>/target/idxd-bench` when absent.
    pub bench_dir: Option<PathBuf>,
    pub report_pattern: String,
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            runs: 1,
            workers: vec![2, 4, 6, 8],
            visible: vec![24, 48, 96],
            include_fast_resize: true,
            include_nv_offload: false,
            thumb_limit: 0,
            thumb_timeout_ms: 0,
            cold_cache: false,
            gpu_telemetry: false,
            gpu_sample_ms: 200,
            max_configs: 0,
            output: None,
            command: BenchmarkCommand::default(),
            workdir: PathBuf::from("."),
            bench_dir: None,
            report_pattern: DEFAULT_REPORT_PATTERN.to_string(),
        }
    }
}

impl SweepPlan {
    /// The four standard axes: workers, visible count, fast resize, offload.
    pub fn axes(&self) -> Result<Vec<SweepAxis>, SweepError> {
        let fast_values = if self.include_fast_resize {
            vec![AxisValue::Flag(false), AxisValue::Flag(true)]
        } else {
            vec![AxisValue::Flag(false)]
        };
        Ok(vec![
            SweepAxis::integers("workers", "--thumb-workers", &self.workers)?,
            SweepAxis::integers("visible_count", "--thumb-visible-count", &self.visible)?,
            SweepAxis::new("fast_resize", "--thumb-fast-resize", fast_values)?,
            SweepAxis::toggle("nv_offload", "--thumb-nv-offload", self.include_nv_offload)?,
        ])
    }

    pub fn options(&self) -> SweepOptions {
        SweepOptions {
            input: self.input.clone(),
            runs: self.runs,
            thumb_limit: self.thumb_limit,
            thumb_timeout_ms: self.thumb_timeout_ms,
            cold_cache: self.cold_cache,
            gpu_telemetry: self.gpu_telemetry,
            gpu_sample_ms: self.gpu_sample_ms,
        }
    }

    pub fn bench_dir(&self) -> PathBuf {
        match &self.bench_dir {
            Some(dir) => dir.clone(),
            None => self.workdir.join("target").join("idxd-bench"),
        }
    }

    /// Checks what the axes cannot: an input path and a positive run count.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.input.as_os_str().is_empty() {
            return Err(SweepError::Config(
                ErrorInfo::new("tsw.plan.input", "no input path given")
                    .with_hint("pass the media directory as the first argument"),
            ));
        }
        if self.runs == 0 {
            return Err(SweepError::Config(ErrorInfo::new(
                "tsw.plan.runs",
                "runs must be at least 1",
            )));
        }
        if self.command.program.trim().is_empty() {
            return Err(SweepError::Config(ErrorInfo::new(
                "tsw.plan.command",
                "benchmark program is empty",
            )));
        }
        Ok(())
    }
}

/// Loads a YAML sweep plan from disk.
pub fn load_plan(path: &Path) -> Result<SweepPlan, SweepError> {
    let bytes = fs::read(path).map_err(|err| {
        SweepError::Config(
            ErrorInfo::new("tsw.plan.read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    from_yaml_slice(&bytes).map_err(|err| match err {
        SweepError::Config(info) => {
            SweepError::Config(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}
