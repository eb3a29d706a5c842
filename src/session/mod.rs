//! Execution session state: the persisted record of scheduling progress.
//!
//! The session is the single source of truth for resuming after a crash.
//! It is mutated only through the pure functions in [`transitions`] and
//! persisted by an explicit [`store::SessionStore::save`] call made by
//! the coordinator after each transition.

pub mod store;
pub mod transitions;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The task has been handed to the executor and not yet reported.
    Running,
    /// The task was reported successful.
    Completed,
    /// The task was reported failed.
    Failed,
}

/// Persisted status of one task's execution attempt.
///
/// Created as `running` on start, transitions to `completed` or `failed`
/// on report, and may return to `running` through an explicit retry.
/// Records are mutated in place across retries, never deleted within a
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExecutionRecord {
    /// Node identifier of the task.
    pub task_id: String,
    /// Title of the task.
    pub task_title: String,
    /// Position of the task in the scheduling snapshot.
    pub task_index: usize,
    /// Current status.
    pub status: ExecutionStatus,
    /// When execution started.
    pub start_time: DateTime<Utc>,
    /// When execution last finished; cleared by a retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// OS process id of the executing agent, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Number of retries applied to this record.
    #[serde(default)]
    pub retry_count: u32,
    /// Last reported error; cleared by a retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Persisted progress record for one execution group.
///
/// Distinct from the coordinator's in-memory plan: the plan says what
/// will run, these records say what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelGroupRecord {
    /// Index of the group in the in-memory plan.
    pub group_index: usize,
    /// When the group was started.
    pub start_time: DateTime<Utc>,
    /// When the group completed, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Execution records for tasks started within this group.
    #[serde(default)]
    pub task_executions: Vec<TaskExecutionRecord>,
    /// Whether every task in the group has been reported.
    #[serde(default)]
    pub is_complete: bool,
}

/// Parallel-mode scheduling state within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelState {
    /// Always true while the state is present.
    pub is_parallel_mode: bool,
    /// Index of the most recently started group; -1 before any group.
    pub current_group_index: i64,
    /// Progress records, one appended per started group.
    #[serde(default)]
    pub execution_groups: Vec<ParallelGroupRecord>,
    /// All task execution records of the session, mutated in place.
    #[serde(default)]
    pub active_executions: Vec<TaskExecutionRecord>,
    /// Concurrency cap in force for this session.
    pub max_concurrent_tasks: usize,
}

/// Persisted record of one scheduling run for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Project name; keys the session in the store.
    pub project: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last mutated by a transition.
    pub updated_at: DateTime<Utc>,
    /// Parallel scheduling state; absent in sequential mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_state: Option<ParallelState>,
}

impl Session {
    /// Create a fresh sequential-mode session for the given project.
    pub fn new(project: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project: project.into(),
            created_at: now,
            updated_at: now,
            parallel_state: None,
        }
    }

    /// Whether the session is in parallel mode.
    pub fn is_parallel(&self) -> bool {
        self.parallel_state.is_some()
    }
}
