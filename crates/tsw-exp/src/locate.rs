use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use glob::{glob, Pattern};
use tracing::debug;
use tsw_core::errors::{ErrorInfo, SweepError};

/// Naming convention of the reports written by the benchmark.
pub const DEFAULT_REPORT_PATTERN: &str = "scan-*.json";

/// Slack applied below the start timestamp to absorb mtime resolution.
pub const MTIME_TOLERANCE: Duration = Duration::from_millis(1);

/// Finds the report written by the invocation that just finished.
///
/// Only exact while invocations never overlap on the same directory.
#[derive(Debug, Clone)]
pub struct ReportLocator {
    dir: PathBuf,
    pattern: String,
    tolerance: Duration,
}

impl ReportLocator {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
            tolerance: MTIME_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the newest matching artifact modified at or after
    /// `started - tolerance`. Equal mtimes resolve to the greater file name.
    pub fn locate(&self, started: SystemTime) -> Result<PathBuf, SweepError> {
        let threshold = started.checked_sub(self.tolerance).unwrap_or(UNIX_EPOCH);
        let escaped_dir = Pattern::escape(&self.dir.to_string_lossy());
        let full_pattern = format!("{}/{}", escaped_dir, self.pattern);
        let entries = glob(&full_pattern).map_err(|err| {
            SweepError::Config(
                ErrorInfo::new("tsw.locate.pattern", err.to_string())
                    .with_context("pattern", full_pattern.clone()),
            )
        })?;

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        let mut stale = 0usize;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable report candidate");
                    continue;
                }
            };
            let Ok(metadata) = path.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < threshold {
                stale += 1;
                continue;
            }
            let replace = match &newest {
                None => true,
                Some((best_time, best_path)) => {
                    (modified, path.file_name()) > (*best_time, best_path.file_name())
                }
            };
            if replace {
                newest = Some((modified, path));
            }
        }

        match newest {
            Some((_, path)) => {
                debug!(path = %path.display(), stale, "located benchmark report");
                Ok(path)
            }
            None => Err(SweepError::NoReportFound(
                ErrorInfo::new("tsw.locate.none", "no benchmark report json produced")
                    .with_context("dir", self.dir.display().to_string())
                    .with_context("pattern", self.pattern.clone())
                    .with_context("started_unix_ms", unix_millis(started))
                    .with_context("stale_candidates", stale.to_string())
                    .with_hint(
                        "the benchmark may have written elsewhere, or clock skew hid the report",
                    ),
            )),
        }
    }
}

fn unix_millis(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().to_string())
        .unwrap_or_else(|_| "before-epoch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn touch(path: &Path, modified: SystemTime) {
        fs::write(path, b"{}").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn ignores_files_outside_the_pattern() {
        let dir = tempdir().unwrap();
        let now = SystemTime::now();
        touch(&dir.path().join("sweep-1.csv"), now + Duration::from_secs(1));
        touch(&dir.path().join("scan-1.json"), now + Duration::from_secs(1));
        let found = ReportLocator::new(dir.path(), DEFAULT_REPORT_PATTERN)
            .locate(now)
            .unwrap();
        assert_eq!(found.file_name().unwrap(), "scan-1.json");
    }

    #[test]
    fn tolerance_admits_slightly_older_reports() {
        let dir = tempdir().unwrap();
        let started = SystemTime::now();
        let path = dir.path().join("scan-2.json");
        touch(&path, started - Duration::from_micros(500));
        let locator = ReportLocator::new(dir.path(), DEFAULT_REPORT_PATTERN);
        assert_eq!(locator.locate(started).unwrap(), path);
        let strict = locator.with_tolerance(Duration::ZERO);
        assert!(matches!(
            strict.locate(started),
            Err(SweepError::NoReportFound(_))
        ));
    }

    #[test]
    fn equal_mtimes_resolve_to_greatest_name() {
        let dir = tempdir().unwrap();
        let started = SystemTime::now();
        let stamp = started + Duration::from_secs(2);
        touch(&dir.path().join("scan-100.json"), stamp);
        touch(&dir.path().join("scan-200.json"), stamp);
        let found = ReportLocator::new(dir.path(), DEFAULT_REPORT_PATTERN)
            .locate(started)
            .unwrap();
        assert_eq!(found.file_name().unwrap(), "scan-200.json");
    }

    #[test]
    fn directory_names_with_glob_characters_are_escaped() {
        let root = tempdir().unwrap();
        let dir = root.path().join("bench [a]");
        fs::create_dir_all(&dir).unwrap();
        let started = SystemTime::now();
        touch(&dir.join("scan-9.json"), started + Duration::from_secs(1));
        let found = ReportLocator::new(&dir, DEFAULT_REPORT_PATTERN)
            .locate(started)
            .unwrap();
        assert_eq!(found, dir.join("scan-9.json"));
    }
}
