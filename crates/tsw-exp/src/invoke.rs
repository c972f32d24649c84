use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tsw_core::errors::{ErrorInfo, SweepError};

use crate::axis::{AxisValue, Configuration};

/// Program and leading arguments used to launch the external benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BenchmarkCommand {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: ["run", "--release", "--", "--benchmark"]
                .iter()
                .map(|arg| arg.to_string())
                .collect(),
        }
    }
}

/// Sweep-wide options forwarded unchanged to every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOptions {
    pub input: PathBuf,
    pub runs: usize,
    pub thumb_limit: usize,
    pub thumb_timeout_ms: u64,
    pub cold_cache: bool,
    pub gpu_telemetry: bool,
    pub gpu_sample_ms: u64,
}

/// Fully resolved external command for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl Invocation {
    /// Space separated command line, suitable for rerunning by hand.
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Seam between the sweep loop and process execution.
pub trait BenchmarkRunner {
    /// Runs the invocation to completion; `Ok` only on a zero exit status.
    fn run(&mut self, invocation: &Invocation) -> Result<(), SweepError>;
}

/// Runs invocations as blocking child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl BenchmarkRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<(), SweepError> {
        let command_line = invocation.command_line();
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.workdir)
            .status()
            .map_err(|err| {
                process_error(&command_line, &invocation.workdir, "spawn", err.to_string())
            })?;
        if status.success() {
            return Ok(());
        }
        let exit_code = match status.code() {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        };
        let message = format!("command failed ({exit_code})");
        Err(process_error(
            &command_line,
            &invocation.workdir,
            &exit_code,
            message,
        ))
    }
}

fn process_error(
    command_line: &str,
    workdir: &Path,
    exit_code: &str,
    message: String,
) -> SweepError {
    SweepError::BenchmarkProcess(
        ErrorInfo::new("tsw.invoke.exit", message)
            .with_context("command", command_line)
            .with_context("exit_code", exit_code)
            .with_context("workdir", workdir.display().to_string()),
    )
}

/// What happened to an invocation handed to [`BenchmarkInvoker::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The process ran and exited with status zero.
    Completed(Invocation),
    /// Dry-run mode: nothing was executed.
    Skipped(Invocation),
}

/// Builds benchmark invocations and hands them to a [`BenchmarkRunner`].
#[derive(Debug)]
pub struct BenchmarkInvoker<R> {
    command: BenchmarkCommand,
    workdir: PathBuf,
    runner: R,
    dry_run: bool,
}

impl<R: BenchmarkRunner> BenchmarkInvoker<R> {
    pub fn new(command: BenchmarkCommand, workdir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            command,
            workdir: workdir.into(),
            runner,
            dry_run: false,
        }
    }

    /// Report invocations instead of executing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Builds the full argument list for one configuration.
    ///
    /// Integer axes follow `--runs`, boolean axes follow the limit and
    /// timeout flags, then cold-cache and telemetry.
    pub fn invocation(&self, config: &Configuration, options: &SweepOptions) -> Invocation {
        let mut args = self.command.args.clone();
        args.push("--path".to_string());
        args.push(options.input.to_string_lossy().into_owned());
        args.push("--runs".to_string());
        args.push(options.runs.to_string());
        for assignment in config.assignments() {
            if let AxisValue::Int(value) = assignment.value {
                args.push(assignment.flag.clone());
                args.push(value.to_string());
            }
        }
        args.push("--thumb-limit".to_string());
        args.push(options.thumb_limit.to_string());
        args.push("--thumb-timeout-ms".to_string());
        args.push(options.thumb_timeout_ms.to_string());
        for assignment in config.assignments() {
            if assignment.value == AxisValue::Flag(true) {
                args.push(assignment.flag.clone());
            }
        }
        if options.cold_cache {
            args.push("--cold-cache".to_string());
        }
        if options.gpu_telemetry {
            args.push("--gpu-telemetry".to_string());
            args.push("--gpu-sample-ms".to_string());
            args.push(options.gpu_sample_ms.to_string());
        }
        Invocation {
            program: self.command.program.clone(),
            args,
            workdir: self.workdir.clone(),
        }
    }

    /// Runs one configuration, blocking until the process exits.
    pub fn invoke(
        &mut self,
        config: &Configuration,
        options: &SweepOptions,
    ) -> Result<InvocationOutcome, SweepError> {
        let invocation = self.invocation(config, options);
        if self.dry_run {
            return Ok(InvocationOutcome::Skipped(invocation));
        }
        debug!(command = %invocation, "invoking benchmark");
        self.runner.run(&invocation)?;
        Ok(InvocationOutcome::Completed(invocation))
    }
}
