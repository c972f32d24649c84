//! Sweep orchestration over an external thumbnail benchmark: configuration
//! space expansion, invocation, report discovery, collection and ranking.

mod axis;
mod collect;
mod hash;
mod invoke;
mod locate;
mod plan;
mod rank;
mod serde;
mod sweep;

pub use axis::{
    generate_configurations, parse_int_list, Assignment, AxisValue, Configuration, SweepAxis,
};
pub use collect::{collect_result, MeasurementRecord, Metrics, METRIC_COLUMNS};
pub use hash::stable_hash_string;
pub use invoke::{
    BenchmarkCommand, BenchmarkInvoker, BenchmarkRunner, Invocation, InvocationOutcome,
    ProcessRunner, SweepOptions,
};
pub use locate::{ReportLocator, DEFAULT_REPORT_PATTERN, MTIME_TOLERANCE};
pub use plan::{load_plan, SweepPlan};
pub use rank::{
    compare_records, csv_header, default_output_path, rank_records, render_summary, write_csv,
    TOP_N,
};
pub use sweep::{Sweep, SweepOutcome, SweepSummary};

pub use tsw_core::errors::{ErrorInfo, SweepError};

pub use crate::serde::{from_yaml_slice, to_canonical_json_bytes};
