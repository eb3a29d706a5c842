//! Dependency graph engine over PRD task lists.
//!
//! The graph is built once per scheduling run from a snapshot of the
//! task list and is never mutated in place; any change to the tasks
//! requires rebuilding it. All queries are pure and deterministic for a
//! given snapshot.

mod cycles;
mod groups;
mod queries;
mod validate;

pub use cycles::CycleReport;
pub use queries::{BlockedTask, ExecutionEligibility, TaskDependencyInfo};
pub use validate::{DependencyError, DependencyErrorKind, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::prd::Task;

/// A task selected for scheduling, carrying its position in the snapshot
/// and its resolved node identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    /// Zero-based position in the task list snapshot.
    pub index: usize,
    /// Node identifier (explicit id or synthetic positional id).
    pub node_id: String,
    /// The task itself.
    pub task: Task,
}

/// Forward and reverse dependency mappings over a task list snapshot.
///
/// Forward edges map a node to the ids it declares in `dependsOn`;
/// reverse edges map a node to the ids that depend on it.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    tasks: Vec<Task>,
    node_ids: Vec<String>,
    index_of: HashMap<String, usize>,
    edges: HashMap<String, HashSet<String>>,
    reverse_edges: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    /// Build the graph from a snapshot of the task list.
    ///
    /// Node identifiers are assigned here: the task's explicit `id` when
    /// present, else a synthetic id from its position. When two tasks
    /// share an id, the first occurrence wins for address resolution.
    pub fn build(tasks: &[Task]) -> Self {
        let tasks = tasks.to_vec();
        let node_ids: Vec<String> = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| task.node_id(index))
            .collect();

        let mut index_of: HashMap<String, usize> = HashMap::new();
        for (index, id) in node_ids.iter().enumerate() {
            index_of.entry(id.clone()).or_insert(index);
        }

        let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
        let mut reverse_edges: HashMap<String, HashSet<String>> = HashMap::new();
        for (index, task) in tasks.iter().enumerate() {
            let id = &node_ids[index];
            let deps: HashSet<String> = task.depends_on.iter().cloned().collect();
            for dep in &deps {
                reverse_edges
                    .entry(dep.clone())
                    .or_default()
                    .insert(id.clone());
            }
            edges.insert(id.clone(), deps);
        }

        Self {
            tasks,
            node_ids,
            index_of,
            edges,
            reverse_edges,
        }
    }

    /// The task snapshot this graph was built from.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Node identifiers, positionally aligned with [`tasks`](Self::tasks).
    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    /// Number of tasks in the snapshot.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resolve a node id to its snapshot position.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    /// Resolve a node id to its task.
    pub fn task_by_id(&self, id: &str) -> Option<&Task> {
        self.index_of(id).map(|index| &self.tasks[index])
    }

    /// Tasks the given node declares as dependencies, in declaration
    /// order. Ids that resolve to no task are skipped.
    pub fn dependencies_of(&self, id: &str) -> Vec<&Task> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };
        self.tasks[index]
            .depends_on
            .iter()
            .filter_map(|dep| self.task_by_id(dep))
            .collect()
    }

    /// Tasks that depend on the given node, in snapshot order.
    pub fn dependents_of(&self, id: &str) -> Vec<&Task> {
        let Some(dependents) = self.reverse_edges.get(id) else {
            return Vec::new();
        };
        let mut indices: Vec<usize> = dependents
            .iter()
            .filter_map(|dependent| self.index_of(dependent))
            .collect();
        indices.sort_unstable();
        indices.into_iter().map(|index| &self.tasks[index]).collect()
    }

    /// Whether a dependency id is satisfied: it resolves to a task that
    /// is done. An unresolvable id never satisfies.
    pub(crate) fn dependency_done(&self, dep_id: &str) -> bool {
        self.task_by_id(dep_id).map(|task| task.done).unwrap_or(false)
    }

    pub(crate) fn scheduled(&self, index: usize) -> ScheduledTask {
        ScheduledTask {
            index,
            node_id: self.node_ids[index].clone(),
            task: self.tasks[index].clone(),
        }
    }

    /// Ordering key for scheduling: explicit priorities ascending first,
    /// tasks without a priority after them, position as the final tie.
    pub(crate) fn priority_key(task: &Task, index: usize) -> (u8, u32, usize) {
        match task.priority {
            Some(priority) => (0, priority, index),
            None => (1, 0, index),
        }
    }
}
