//! Structured error types shared across the sweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Reproduction context (command line, path, exit code, ...).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Looks up a context entry.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the sweep engine.
///
/// None of these are retried: the first one raised aborts the sweep and the
/// records collected so far are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Malformed sweep-axis input, raised before any invocation.
    #[error("invalid axis: {0}")]
    InvalidAxis(ErrorInfo),
    /// The external benchmark exited unsuccessfully or could not be spawned.
    #[error("benchmark process failed: {0}")]
    BenchmarkProcess(ErrorInfo),
    /// No fresh report artifact was found after an invocation.
    #[error("no report found: {0}")]
    NoReportFound(ErrorInfo),
    /// A report artifact could not be interpreted.
    #[error("report parse error: {0}")]
    ReportParse(ErrorInfo),
    /// The sweep finished without producing a single record.
    #[error("empty result set: {0}")]
    EmptyResultSet(ErrorInfo),
    /// Sweep plan loading or validation errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Filesystem errors while preparing directories or writing outputs.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::InvalidAxis(info)
            | SweepError::BenchmarkProcess(info)
            | SweepError::NoReportFound(info)
            | SweepError::ReportParse(info)
            | SweepError::EmptyResultSet(info)
            | SweepError::Config(info)
            | SweepError::Io(info) => info,
        }
    }

    /// True when the sweep ran to completion but collected nothing.
    pub fn is_empty_result_set(&self) -> bool {
        matches!(self, SweepError::EmptyResultSet(_))
    }
}
