use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use tsw_core::errors::{ErrorInfo, SweepError};

use crate::axis::{generate_configurations, Configuration};
use crate::collect::{collect_result, MeasurementRecord};
use crate::hash::stable_hash_string;
use crate::invoke::{
    BenchmarkInvoker, BenchmarkRunner, InvocationOutcome, ProcessRunner, SweepOptions,
};
use crate::locate::ReportLocator;
use crate::plan::SweepPlan;
use crate::rank::{default_output_path, rank_records, render_summary, write_csv};
use crate::serde::to_canonical_json_bytes;

fn io_error(code: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "could not remove partial export");
        }
    }
}

/// Artefacts of a sweep that ran every configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    /// Records in rank order, best first.
    pub records: Vec<MeasurementRecord>,
    pub csv_path: PathBuf,
    pub plan_path: PathBuf,
    pub plan_hash: String,
}

/// How a sweep finished.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    /// Commands were printed, nothing ran.
    DryRun { configurations: usize },
    Completed(SweepSummary),
}

#[derive(Serialize)]
struct PlanSidecar<'a> {
    plan: &'a SweepPlan,
    plan_hash: &'a str,
    records: usize,
    best: String,
    csv: String,
}

/// Drives configurations through invoke, locate and collect, then ranks and
/// exports the records.
///
/// Strictly sequential: the report lookup relies on no other invocation
/// writing into the benchmark directory at the same time.
#[derive(Debug)]
pub struct Sweep<R> {
    plan: SweepPlan,
    invoker: BenchmarkInvoker<R>,
    locator: ReportLocator,
}

impl Sweep<ProcessRunner> {
    /// Sweep that launches the benchmark as a child process.
    pub fn with_process_runner(plan: SweepPlan) -> Self {
        Self::new(plan, ProcessRunner)
    }
}

impl<R: BenchmarkRunner> Sweep<R> {
    pub fn new(plan: SweepPlan, runner: R) -> Self {
        let invoker = BenchmarkInvoker::new(plan.command.clone(), plan.workdir.clone(), runner);
        let locator = ReportLocator::new(plan.bench_dir(), plan.report_pattern.clone());
        Self {
            plan,
            invoker,
            locator,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.invoker = self.invoker.dry_run(dry_run);
        self
    }

    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    pub fn runner(&self) -> &R {
        self.invoker.runner()
    }

    /// Generates the configuration space from the plan and runs it.
    pub fn run(&mut self) -> Result<SweepOutcome, SweepError> {
        self.plan.validate()?;
        let axes = self.plan.axes()?;
        let configurations = generate_configurations(&axes, Some(self.plan.max_configs))?;
        self.run_configurations(&configurations)
    }

    /// Runs the given configurations in order. The first failure aborts the
    /// sweep and nothing is exported.
    pub fn run_configurations(
        &mut self,
        configurations: &[Configuration],
    ) -> Result<SweepOutcome, SweepError> {
        let bench_dir = self.locator.dir().to_path_buf();
        let dry_run = self.invoker.is_dry_run();
        if !dry_run {
            fs::create_dir_all(&bench_dir)
                .map_err(|err| io_error("tsw.sweep.bench_dir", &bench_dir, err))?;
        }
        let plan_hash = stable_hash_string(&self.plan)?;
        info!(
            configs = configurations.len(),
            plan_hash = %plan_hash,
            bench_dir = %bench_dir.display(),
            dry_run,
            "starting sweep"
        );

        println!("Running {} configs", configurations.len());
        let options = self.plan.options();
        let mut records = Vec::with_capacity(configurations.len());
        let total = configurations.len();
        for (idx, configuration) in configurations.iter().enumerate() {
            println!("[{}/{}] {}", idx + 1, total, configuration.label());
            self.run_one(configuration, &options, &mut records)?;
        }

        if dry_run {
            return Ok(SweepOutcome::DryRun {
                configurations: total,
            });
        }
        if records.is_empty() {
            return Err(SweepError::EmptyResultSet(
                ErrorInfo::new("tsw.sweep.empty", "No results collected")
                    .with_context("configurations", total.to_string()),
            ));
        }

        rank_records(&mut records);
        let csv_path = match &self.plan.output {
            Some(path) => path.clone(),
            None => default_output_path(&bench_dir, Utc::now()),
        };
        let plan_path = self.export(&csv_path, &plan_hash, &records)?;
        info!(
            records = records.len(),
            csv = %csv_path.display(),
            "sweep exported"
        );
        print!("{}", render_summary(&records, &csv_path));

        Ok(SweepOutcome::Completed(SweepSummary {
            records,
            csv_path,
            plan_path,
            plan_hash,
        }))
    }

    fn run_one(
        &mut self,
        configuration: &Configuration,
        options: &SweepOptions,
        records: &mut Vec<MeasurementRecord>,
    ) -> Result<(), SweepError> {
        let started = SystemTime::now();
        match self.invoker.invoke(configuration, options)? {
            InvocationOutcome::Skipped(invocation) => {
                println!("{invocation}");
                return Ok(());
            }
            InvocationOutcome::Completed(invocation) => {
                debug!(command = %invocation, "benchmark exited cleanly");
            }
        }
        let report = self.locator.locate(started)?;
        let record = collect_result(&report, configuration)?;
        info!(
            config = %configuration.label(),
            visible_ms = record.metrics.thumb_visible_ms,
            elapsed_ms = record.metrics.elapsed_ms,
            report = %report.display(),
            "collected result"
        );
        records.push(record);
        Ok(())
    }

    /// Writes the CSV and its plan sidecar. Either both files are left on
    /// disk or neither is.
    fn export(
        &self,
        csv_path: &Path,
        plan_hash: &str,
        records: &[MeasurementRecord],
    ) -> Result<PathBuf, SweepError> {
        let sidecar = PlanSidecar {
            plan: &self.plan,
            plan_hash,
            records: records.len(),
            best: records
                .first()
                .map(|record| record.configuration.label())
                .unwrap_or_default(),
            csv: csv_path.display().to_string(),
        };
        let sidecar_bytes = to_canonical_json_bytes(&sidecar)?;
        let plan_path = csv_path.with_extension("plan.json");

        if let Err(err) = write_csv(csv_path, records) {
            discard(csv_path);
            return Err(err);
        }
        if let Err(err) = fs::write(&plan_path, sidecar_bytes) {
            discard(csv_path);
            return Err(io_error("tsw.sweep.plan_sidecar", &plan_path, err));
        }
        Ok(plan_path)
    }
}
