//! Append-only human-readable progress log.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Best-effort progress sink.
///
/// Each entry is one timestamped line appended to the log file. Write
/// failures are reported as warnings and never propagate into
/// scheduling.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    /// Create a progress log writing to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    pub fn append(&self, message: &str) {
        if let Err(err) = self.try_append(message) {
            tracing::warn!(
                "failed to append progress entry to {}: {}",
                self.path.display(),
                err
            );
        }
    }

    fn try_append(&self, message: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "[{}] {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_writes_timestamped_lines() {
        let temp_dir = TempDir::new().expect("temp dir");
        let log = ProgressLog::new(temp_dir.path().join("progress.txt"));

        log.append("group 0 started");
        log.append("task completed: Build API");

        let content = fs::read_to_string(log.path()).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("group 0 started"));
        assert!(lines[1].contains("Build API"));
    }

    #[test]
    fn test_append_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("temp dir");
        let log = ProgressLog::new(temp_dir.path().join("nested").join("progress.txt"));

        log.append("hello");
        assert!(log.path().exists());
    }

    #[test]
    fn test_append_failure_does_not_panic() {
        // The path points at a directory, so the open fails; the failure
        // must stay inside the log.
        let temp_dir = TempDir::new().expect("temp dir");
        let log = ProgressLog::new(temp_dir.path());
        log.append("dropped");
    }
}
