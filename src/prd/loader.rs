//! PRD file loading.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Prd, Task, TaskSource};

/// Errors that can occur while loading a PRD file.
#[derive(Error, Debug)]
pub enum PrdError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for PRD loading operations.
pub type PrdResult<T> = Result<T, PrdError>;

/// Load and parse a PRD file.
pub fn load_prd(path: &Path) -> PrdResult<Prd> {
    let content = fs::read_to_string(path)?;
    let prd = serde_json::from_str(&content)?;
    Ok(prd)
}

/// Task source backed by a PRD file on disk.
///
/// Every load re-reads the file, so edits applied between calls (for
/// instance a task manually marked done) are observed.
#[derive(Debug, Clone)]
pub struct FilePrdSource {
    path: PathBuf,
}

impl FilePrdSource {
    /// Create a source reading from the given PRD file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing PRD file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for FilePrdSource {
    fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let prd = load_prd(&self.path)?;
        Ok(prd.tasks)
    }
}
