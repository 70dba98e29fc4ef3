use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

/// Year-Monthname-Day-Hour:Minute:Second, e.g. `2023-Sep-02-18:53:26`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Append-only run log. One `<timestamp> : <message>` line per event.
///
/// Write failures are reported through `tracing` and otherwise ignored so a
/// broken log never stops a run.
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, message: &str) {
        info!("{}", message);
        let line = format_line(Local::now().naive_local(), message);
        if let Err(e) = self.append(&line) {
            warn!("Could not write to {}: {}", self.path.display(), e);
        }
    }

    pub fn error(&self, message: impl std::fmt::Display) {
        self.log(&format!("ERROR: {}", message));
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", line)
    }
}

pub fn format_line(at: NaiveDateTime, message: &str) -> String {
    format!("{} : {}", at.format(TIMESTAMP_FORMAT), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn line_format() {
        let at = NaiveDate::from_ymd_opt(2023, 9, 2)
            .unwrap()
            .and_hms_opt(8, 5, 26)
            .unwrap();
        assert_eq!(
            format_line(at, "Process complete."),
            "2023-Sep-02-08:05:26 : Process complete."
        );
    }

    #[test]
    fn appends_one_line_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let log = ProgressLog::new(dir.path().join("etl.log"));
        log.log("first");
        log.error("boom");

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" : first"));
        assert!(lines[1].ends_with(" : ERROR: boom"));
    }

    #[test]
    fn unwritable_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let log = ProgressLog::new(dir.path().join("no").join("such").join("dir.log"));
        log.log("ignored");
        assert!(!log.path().exists());
    }
}
