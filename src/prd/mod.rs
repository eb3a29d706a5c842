//! PRD data model: a named project with an ordered task list.
//!
//! Tasks are addressed by their explicit `id` when present, otherwise by
//! a synthetic identifier derived from their position in the task list.
//! Position is significant: it breaks scheduling ties and anchors the
//! synthetic identifiers, so callers must not reorder tasks mid-run.

mod loader;

pub use loader::{load_prd, FilePrdSource, PrdError, PrdResult};

use serde::{Deserialize, Serialize};

/// Prefix of synthetic node identifiers assigned to tasks without an
/// explicit `id`.
pub const SYNTHETIC_ID_PREFIX: &str = "__index_";

/// A unit of work within a PRD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Human-facing task title, also the fallback identifier in logs.
    pub title: String,
    /// Stable identifier other tasks can depend on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-form description of the work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Implementation steps. Opaque to scheduling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    /// Ids of tasks that must complete before this one may start.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Scheduling priority. Lower values run earlier; tasks without a
    /// priority sort after any task with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
}

impl Task {
    /// Create a task with the given title and no other attributes.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: None,
            description: None,
            steps: Vec::new(),
            depends_on: Vec::new(),
            priority: None,
            done: false,
        }
    }

    /// Set the stable identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the dependency id list.
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the scheduling priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark the task as already completed.
    pub fn completed(mut self) -> Self {
        self.done = true;
        self
    }

    /// Node identifier for this task at the given position in the task
    /// list: the explicit `id` when present, else `"__index_<position>"`.
    ///
    /// Synthetic identifiers are not stable across list reordering or
    /// insertion; they are valid only for the snapshot they were derived
    /// from.
    pub fn node_id(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}{}", SYNTHETIC_ID_PREFIX, index),
        }
    }
}

/// A project record: a name plus an ordered task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prd {
    /// Project name. Keys the persisted session.
    pub project: String,
    /// Free-form project description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered task list. Position is significant.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Prd {
    /// Create an empty PRD for the given project.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            description: None,
            tasks: Vec::new(),
        }
    }
}

/// Read-only access to the current task list.
///
/// Every call to [`TaskSource::load_tasks`] must reflect externally
/// applied edits (for instance a task manually marked done while a run
/// is in progress).
pub trait TaskSource {
    /// Load the current task list.
    fn load_tasks(&self) -> anyhow::Result<Vec<Task>>;
}

impl TaskSource for Vec<Task> {
    fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        Ok(self.clone())
    }
}
