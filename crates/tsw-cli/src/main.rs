use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tsw_core::errors::SweepError;
use tsw_exp::{load_plan, parse_int_list, Sweep, SweepOutcome, SweepPlan};

#[derive(Parser, Debug)]
#[command(
    name = "tsw-sweep",
    about = "Sweep thumbnail benchmark tuning knobs and rank results"
)]
struct Cli {
    /// Media directory path handed to the benchmark.
    path: Option<PathBuf>,
    /// YAML sweep plan; flags given here override its values.
    #[arg(long)]
    plan: Option<PathBuf>,
    /// Benchmark runs per config (default: 1).
    #[arg(long)]
    runs: Option<usize>,
    /// Comma list for --thumb-workers (default: 2,4,6,8).
    #[arg(long)]
    workers: Option<String>,
    /// Comma list for --thumb-visible-count (default: 24,48,96).
    #[arg(long)]
    visible: Option<String>,
    /// Images to thumbnail; 0 means all.
    #[arg(long)]
    thumb_limit: Option<usize>,
    /// Per-image timeout forwarded as --thumb-timeout-ms; 0 disables it.
    #[arg(long)]
    thumb_timeout_ms: Option<u64>,
    /// Also test --thumb-nv-offload.
    #[arg(long, overrides_with = "no_include_nv_offload")]
    include_nv_offload: bool,
    /// Only test with --thumb-nv-offload off, even if the plan enables it.
    #[arg(long, overrides_with = "include_nv_offload")]
    no_include_nv_offload: bool,
    /// Pass --cold-cache for each config.
    #[arg(long, overrides_with = "no_cold_cache")]
    cold_cache: bool,
    /// Drop --cold-cache even if the plan enables it.
    #[arg(long, overrides_with = "cold_cache")]
    no_cold_cache: bool,
    /// Pass --gpu-telemetry for each config.
    #[arg(long, overrides_with = "no_gpu_telemetry")]
    gpu_telemetry: bool,
    /// Drop --gpu-telemetry even if the plan enables it.
    #[arg(long, overrides_with = "gpu_telemetry")]
    no_gpu_telemetry: bool,
    /// Telemetry sampling interval (default: 200).
    #[arg(long)]
    gpu_sample_ms: Option<u64>,
    /// Limit number of configs; 0 keeps all.
    #[arg(long)]
    max_configs: Option<usize>,
    /// CSV output path (default: <bench dir>/sweep-<unix seconds>.csv).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Directory the benchmark is launched from (default: .).
    #[arg(long)]
    workdir: Option<PathBuf>,
    /// Directory the benchmark writes reports to (default: <workdir>/target/idxd-bench).
    #[arg(long)]
    bench_dir: Option<PathBuf>,
    /// Print the commands without running them.
    #[arg(long)]
    dry_run: bool,
    /// Debug level logging.
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn resolve_plan(&self) -> Result<SweepPlan, SweepError> {
        let mut plan = match &self.plan {
            Some(path) => load_plan(path)?,
            None => SweepPlan::default(),
        };
        if let Some(path) = &self.path {
            plan.input = path.clone();
        }
        if let Some(runs) = self.runs {
            plan.runs = runs;
        }
        if let Some(raw) = &self.workers {
            plan.workers = parse_int_list("workers", raw)?;
        }
        if let Some(raw) = &self.visible {
            plan.visible = parse_int_list("visible_count", raw)?;
        }
        if let Some(limit) = self.thumb_limit {
            plan.thumb_limit = limit;
        }
        if let Some(timeout) = self.thumb_timeout_ms {
            plan.thumb_timeout_ms = timeout;
        }
        if let Some(sample) = self.gpu_sample_ms {
            plan.gpu_sample_ms = sample;
        }
        if let Some(max) = self.max_configs {
            plan.max_configs = max;
        }
        if let Some(output) = &self.output {
            plan.output = Some(output.clone());
        }
        if let Some(workdir) = &self.workdir {
            plan.workdir = workdir.clone();
        }
        if let Some(bench_dir) = &self.bench_dir {
            plan.bench_dir = Some(bench_dir.clone());
        }
        plan.include_nv_offload = switch(
            plan.include_nv_offload,
            self.include_nv_offload,
            self.no_include_nv_offload,
        );
        plan.cold_cache = switch(plan.cold_cache, self.cold_cache, self.no_cold_cache);
        plan.gpu_telemetry = switch(plan.gpu_telemetry, self.gpu_telemetry, self.no_gpu_telemetry);
        Ok(plan)
    }
}

/// `--flag` / `--no-flag` pair over a plan value; the last one given wins.
fn switch(plan_value: bool, on: bool, off: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        plan_value
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "tsw_exp=debug,tsw_sweep=debug"
    } else {
        "tsw_exp=info,tsw_sweep=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<SweepOutcome, SweepError> {
    let plan = cli.resolve_plan()?;
    debug!(?plan, "resolved sweep plan");
    Sweep::with_process_runner(plan).dry_run(cli.dry_run).run()
}

/// Maps the sweep result to an optional stderr line and the process exit code.
fn finish(result: Result<SweepOutcome, SweepError>) -> (Option<String>, u8) {
    match result {
        Ok(SweepOutcome::DryRun { configurations }) => {
            debug!(configurations, "dry run finished");
            (None, 0)
        }
        Ok(SweepOutcome::Completed(_)) => (None, 0),
        Err(err) if err.is_empty_result_set() => (Some("No results collected".to_string()), 1),
        Err(err) => (Some(format!("sweep aborted: {err}")), 1),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let (message, code) = finish(run(&cli));
    if let Some(message) = message {
        eprintln!("{message}");
    }
    ExitCode::from(code)
}
