//! Parallel execution coordination.
//!
//! [`ParallelCoordinator`] turns a validated task list into a group plan
//! (via the graph engine), advances through the groups, and records task
//! starts and outcomes against the persisted session. It is synchronous
//! single-threaded control logic: "parallel" is the logical cap on how
//! many tasks may be reported running at once, and the external executor
//! that actually runs agents calls back with outcomes. Ordering
//! guarantees come from the caller invoking operations in sequence: a
//! group is started before any of its task starts are recorded, and all
//! of its completions are reported before the next group starts.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::graph::{DependencyGraph, ScheduledTask};
use crate::prd::{Task, TaskSource};
use crate::progress::ProgressLog;
use crate::session::store::SessionStore;
use crate::session::{transitions, Session};

/// Logical concurrency settings for a scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Whether parallel scheduling is in effect.
    pub enabled: bool,
    /// Maximum number of tasks that may be reported running at once.
    pub max_concurrent_tasks: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrent_tasks: 3,
        }
    }
}

/// Outcome of coordinator initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct InitOutcome {
    /// Whether the dependency graph passed validation and cycle checks.
    pub is_valid: bool,
    /// Combined violation message, one line per violation.
    pub error: Option<String>,
}

impl InitOutcome {
    fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    fn invalid(message: String) -> Self {
        Self {
            is_valid: false,
            error: Some(message),
        }
    }
}

/// A batch of tasks released for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStart {
    /// Index of the started group in the plan.
    pub group_index: usize,
    /// The tasks to hand to the executor, at most the concurrency cap.
    pub tasks: Vec<ScheduledTask>,
}

/// Result of reporting a task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Whether every task of the in-flight group has now been reported.
    pub group_complete: bool,
    /// Whether no task of the group has failed so far. Meaningful once
    /// `group_complete` is true.
    pub all_succeeded: bool,
}

/// Snapshot of coordinator progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSummary {
    /// Number of groups in the plan.
    pub total_groups: usize,
    /// Number of groups fully reported.
    pub completed_groups: usize,
    /// Index of the next group to start.
    pub current_group_index: usize,
    /// Whether a group is currently in flight.
    pub is_active: bool,
}

struct InFlightGroup {
    group_index: usize,
    tasks: Vec<ScheduledTask>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    started_at: Instant,
}

/// Coordinates group-by-group parallel task execution.
pub struct ParallelCoordinator {
    source: Box<dyn TaskSource>,
    store: Option<SessionStore>,
    session: Option<Session>,
    progress: Option<ProgressLog>,
    config: ParallelConfig,
    plan: Vec<Vec<ScheduledTask>>,
    current_group_index: usize,
    current_group: Option<InFlightGroup>,
    task_results: HashMap<String, bool>,
}

impl ParallelCoordinator {
    /// Create a coordinator reading tasks from the given source.
    pub fn new(source: Box<dyn TaskSource>) -> Self {
        Self {
            source,
            store: None,
            session: None,
            progress: None,
            config: ParallelConfig::default(),
            plan: Vec::new(),
            current_group_index: 0,
            current_group: None,
            task_results: HashMap::new(),
        }
    }

    /// Attach a persisted session. The coordinator saves it after every
    /// state change so a crash mid-group can be diagnosed from the file.
    pub fn attach_session(&mut self, store: SessionStore, session: Session) {
        self.store = Some(store);
        self.session = Some(session);
    }

    /// Attach a progress log for human-readable scheduling events.
    pub fn attach_progress(&mut self, progress: ProgressLog) {
        self.progress = Some(progress);
    }

    /// The active session, if one is attached.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The concurrency settings in force.
    pub fn config(&self) -> ParallelConfig {
        self.config
    }

    /// The computed group plan.
    pub fn plan(&self) -> &[Vec<ScheduledTask>] {
        &self.plan
    }

    /// Validate the task list and compute the group plan.
    ///
    /// With parallelism disabled this succeeds trivially and performs no
    /// graph work. Otherwise validation and cycle detection both run;
    /// either failure aborts initialization with a combined message (one
    /// line per violation) and leaves prior state untouched. On success
    /// the plan is stored, the cursor resets to the first group, and an
    /// attached session is transitioned into parallel mode.
    pub fn initialize(&mut self, tasks: &[Task], config: ParallelConfig) -> InitOutcome {
        if !config.enabled {
            self.config = config;
            return InitOutcome::valid();
        }

        let graph = DependencyGraph::build(tasks);
        let report = graph.preflight();
        if !report.is_valid {
            let message = report
                .errors
                .iter()
                .map(|error| error.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            return InitOutcome::invalid(message);
        }

        self.plan = graph.parallel_execution_groups();
        self.current_group_index = 0;
        self.current_group = None;
        self.task_results.clear();
        self.config = config;

        if self.session.is_some() {
            let cap = config.max_concurrent_tasks;
            self.apply_transition(|session| transitions::enable_parallel_mode(session, cap));
        }
        self.log_progress(&format!(
            "parallel mode enabled: {} groups planned, concurrency cap {}",
            self.plan.len(),
            config.max_concurrent_tasks
        ));

        InitOutcome::valid()
    }

    /// Start the next group of the plan and return its batch.
    ///
    /// Returns `None` once the cursor is past the last group. Known
    /// limitation, kept for compatibility with existing callers: when a
    /// level holds more tasks than the concurrency cap, only the first
    /// `max_concurrent_tasks` tasks (in the level's priority order) form
    /// the batch, and the rest of the level is not re-sliced into a
    /// later batch.
    pub fn start_next_group(&mut self) -> Option<GroupStart> {
        loop {
            if self.current_group_index >= self.plan.len() {
                return None;
            }

            let group = &self.plan[self.current_group_index];
            if group.is_empty() {
                self.current_group_index += 1;
                continue;
            }

            let cap = self.config.max_concurrent_tasks.max(1);
            let batch: Vec<ScheduledTask> = group.iter().take(cap).cloned().collect();
            let group_index = self.current_group_index;
            if batch.len() < group.len() {
                tracing::debug!(
                    "group {} truncated to concurrency cap: {} of {} tasks",
                    group_index,
                    batch.len(),
                    group.len()
                );
            }

            self.current_group = Some(InFlightGroup {
                group_index,
                tasks: batch.clone(),
                completed: HashSet::new(),
                failed: HashSet::new(),
                started_at: Instant::now(),
            });
            self.task_results.clear();
            self.apply_transition(|session| transitions::start_parallel_group(session, group_index));
            self.log_progress(&format!(
                "group {} started with {} task(s)",
                group_index,
                batch.len()
            ));

            return Some(GroupStart { group_index, tasks: batch });
        }
    }

    /// Record that the executor has started a task from the current
    /// batch. The execution id is the task's node id from the group
    /// plan, so tasks sharing a title cannot misresolve.
    pub fn record_task_start(&mut self, task: &ScheduledTask, process_id: Option<u32>) {
        tracing::debug!(
            "task started: {} ({}), pid {:?}",
            task.task.title,
            task.node_id,
            process_id
        );
        let start = transitions::TaskStart {
            task_id: task.node_id.clone(),
            task_title: task.task.title.clone(),
            task_index: task.index,
            process_id,
        };
        self.apply_transition(|session| transitions::start_task_execution(session, start));
        self.log_progress(&format!(
            "task started: {} ({})",
            task.task.title, task.node_id
        ));
    }

    /// Record a task outcome and advance the group when it is the last
    /// one outstanding.
    ///
    /// Reporting with no group in flight returns the sentinel
    /// `{ group_complete: true, all_succeeded: false }`; that sentinel
    /// is not a real all-done signal and only means the report had
    /// nowhere to land (a stale callback racing a group change).
    pub fn record_task_complete(
        &mut self,
        task_id: &str,
        task_title: &str,
        was_successful: bool,
        error: Option<&str>,
    ) -> CompletionOutcome {
        let Some(group) = self.current_group.as_mut() else {
            tracing::warn!(
                "completion reported for \"{}\" ({}) with no group in flight",
                task_title,
                task_id
            );
            return CompletionOutcome {
                group_complete: true,
                all_succeeded: false,
            };
        };

        if was_successful {
            group.completed.insert(task_id.to_string());
        } else {
            group.failed.insert(task_id.to_string());
        }
        let group_index = group.group_index;
        let failed_count = group.failed.len();
        let finished = group.completed.len() + failed_count;
        let group_complete = finished >= group.tasks.len();
        let all_succeeded = group.failed.is_empty();

        self.task_results.insert(task_id.to_string(), was_successful);

        if was_successful {
            self.apply_transition(|session| {
                transitions::complete_task_execution(session, task_id, true)
            });
            self.log_progress(&format!("task completed: {} ({})", task_title, task_id));
        } else {
            let detail = error.unwrap_or("task failed");
            self.apply_transition(|session| {
                transitions::fail_task_execution(session, task_id, detail)
            });
            self.log_progress(&format!(
                "task failed: {} ({}): {}",
                task_title, task_id, detail
            ));
        }

        if group_complete {
            let elapsed = self
                .current_group
                .take()
                .map(|group| group.started_at.elapsed())
                .unwrap_or_default();
            self.apply_transition(|session| {
                transitions::complete_parallel_group(session, group_index)
            });
            self.current_group_index += 1;
            self.log_progress(&format!(
                "group {} complete in {:.1}s, {} failed",
                group_index,
                elapsed.as_secs_f64(),
                failed_count
            ));
        }

        CompletionOutcome {
            group_complete,
            all_succeeded,
        }
    }

    /// Reload the task list and return the tasks ready to run right now,
    /// truncated to the concurrency cap.
    ///
    /// Independent of the group plan and cursor: the source of truth is
    /// re-read, so externally applied edits (a task manually marked
    /// done) are reflected.
    pub fn ready_tasks_for_execution(&self) -> anyhow::Result<Vec<ScheduledTask>> {
        let tasks = self.source.load_tasks()?;
        let graph = DependencyGraph::build(&tasks);
        let cap = self.config.max_concurrent_tasks.max(1);
        Ok(graph.ready_tasks().into_iter().take(cap).collect())
    }

    /// Whether any group remains to be started.
    pub fn has_more_groups(&self) -> bool {
        self.current_group_index < self.plan.len()
    }

    /// The recorded outcome of a task in the current group, if reported.
    pub fn task_result(&self, task_id: &str) -> Option<bool> {
        self.task_results.get(task_id).copied()
    }

    /// Snapshot of scheduling progress.
    pub fn summary(&self) -> CoordinatorSummary {
        CoordinatorSummary {
            total_groups: self.plan.len(),
            completed_groups: self.current_group_index,
            current_group_index: self.current_group_index,
            is_active: self.current_group.is_some(),
        }
    }

    /// Turn parallel scheduling off and drop the in-memory plan.
    /// Idempotent: disabling an already-disabled coordinator changes
    /// nothing. An attached session leaves parallel mode.
    pub fn disable(&mut self) {
        if !self.config.enabled {
            return;
        }
        self.config = ParallelConfig::default();
        self.plan.clear();
        self.current_group_index = 0;
        self.current_group = None;
        self.task_results.clear();
        self.apply_transition(transitions::disable_parallel_mode);
        self.log_progress("parallel mode disabled");
    }

    /// Tear down to uninitialized defaults, including the cached
    /// configuration. Safe to call repeatedly and from any state.
    pub fn reset(&mut self) {
        self.config = ParallelConfig::default();
        self.plan = Vec::new();
        self.current_group_index = 0;
        self.current_group = None;
        self.task_results.clear();
    }

    /// Re-initialize from a fresh task snapshot, recovering the group
    /// cursor from the attached session's persisted parallel state.
    ///
    /// Tasks are not assumed unchanged across restarts, so the plan is
    /// recomputed from scratch; the recovered cursor is clamped to the
    /// new plan. A persisted group that completed is skipped, an
    /// incomplete one is restarted.
    pub fn resume(&mut self, tasks: &[Task], config: ParallelConfig) -> InitOutcome {
        let recovered = self
            .session
            .as_ref()
            .and_then(|session| session.parallel_state.as_ref())
            .map(|state| {
                if state.current_group_index < 0 {
                    return 0;
                }
                let cursor = state.current_group_index as usize;
                let last_started_complete = state
                    .execution_groups
                    .iter()
                    .rev()
                    .find(|group| group.group_index as i64 == state.current_group_index)
                    .map(|group| group.is_complete)
                    .unwrap_or(false);
                if last_started_complete {
                    cursor + 1
                } else {
                    cursor
                }
            });

        let outcome = self.initialize(tasks, config);
        if outcome.is_valid {
            if let Some(cursor) = recovered {
                self.current_group_index = cursor.min(self.plan.len());
                self.log_progress(&format!(
                    "resumed at group {} of {}",
                    self.current_group_index,
                    self.plan.len()
                ));
            }
        }
        outcome
    }

    fn apply_transition<F>(&mut self, transition: F)
    where
        F: FnOnce(Session) -> Session,
    {
        let Some(session) = self.session.take() else {
            return;
        };
        let session = transition(session);
        if let Some(store) = &self.store {
            if let Err(err) = store.save(&session) {
                tracing::warn!("failed to persist session for {}: {}", session.project, err);
            }
        }
        self.session = Some(session);
    }

    fn log_progress(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress.append(message);
        }
    }
}
