//! Readiness and blocking queries over the dependency graph.

use crate::prd::Task;

use super::{DependencyGraph, ScheduledTask};

/// A not-done task with at least one incomplete dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedTask {
    /// Zero-based position in the task list snapshot.
    pub index: usize,
    /// Node identifier of the blocked task.
    pub node_id: String,
    /// The task itself.
    pub task: Task,
    /// Unmet dependencies, by title when the id resolves, else the raw id.
    pub blocked_by: Vec<String>,
}

/// A task annotated with its dependency state, for diagnostics and
/// reporting commands.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDependencyInfo {
    /// Zero-based position in the task list snapshot.
    pub index: usize,
    /// Node identifier of the task.
    pub node_id: String,
    /// The task itself.
    pub task: Task,
    /// Declared dependency ids that resolve to a task, in declaration order.
    pub dependencies: Vec<String>,
    /// Whether the task is not done and all its dependencies are done.
    pub is_ready: bool,
    /// Unmet dependencies, by title when the id resolves, else the raw id.
    pub blocked_by: Vec<String>,
}

/// Whether a task may execute right now.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEligibility {
    /// Not done, every dependency done.
    Runnable,
    /// The id resolves to no task.
    NotFound,
    /// The task is already done.
    AlreadyCompleted,
    /// At least one dependency is incomplete.
    Blocked {
        /// Unmet dependencies, by title when the id resolves, else the raw id.
        blocked_by: Vec<String>,
    },
}

impl ExecutionEligibility {
    /// Whether execution may proceed.
    pub fn can_execute(&self) -> bool {
        matches!(self, Self::Runnable)
    }

    /// Human-readable refusal reason, `None` when runnable.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Runnable => None,
            Self::NotFound => Some("not found"),
            Self::AlreadyCompleted => Some("already completed"),
            Self::Blocked { .. } => Some("blocked by incomplete dependencies"),
        }
    }
}

impl DependencyGraph {
    /// Unmet dependencies of the task at `index`, labeled by the
    /// dependency's title when it resolves, else by the raw id.
    fn unmet_dependency_labels(&self, index: usize) -> Vec<String> {
        self.tasks()[index]
            .depends_on
            .iter()
            .filter(|dep| !self.dependency_done(dep))
            .map(|dep| match self.task_by_id(dep) {
                Some(task) => task.title.clone(),
                None => dep.clone(),
            })
            .collect()
    }

    fn is_ready_at(&self, index: usize) -> bool {
        let task = &self.tasks()[index];
        !task.done && task.depends_on.iter().all(|dep| self.dependency_done(dep))
    }

    /// Tasks that are not done and whose dependencies are all done, in
    /// snapshot order. A dependency-free, not-done task is always ready;
    /// done tasks are never included.
    pub fn ready_tasks(&self) -> Vec<ScheduledTask> {
        (0..self.len())
            .filter(|&index| self.is_ready_at(index))
            .map(|index| self.scheduled(index))
            .collect()
    }

    /// Not-done tasks with at least one not-done dependency, in snapshot
    /// order, each carrying its unmet dependencies.
    pub fn blocked_tasks(&self) -> Vec<BlockedTask> {
        self.tasks()
            .iter()
            .enumerate()
            .filter(|(index, task)| !task.done && !self.is_ready_at(*index))
            .map(|(index, task)| BlockedTask {
                index,
                node_id: self.node_ids()[index].clone(),
                task: task.clone(),
                blocked_by: self.unmet_dependency_labels(index),
            })
            .collect()
    }

    /// Every task (done or not) annotated with its dependency state, in
    /// snapshot order.
    pub fn tasks_with_dependency_info(&self) -> Vec<TaskDependencyInfo> {
        self.tasks()
            .iter()
            .enumerate()
            .map(|(index, task)| {
                let dependencies: Vec<String> = task
                    .depends_on
                    .iter()
                    .filter(|dep| self.index_of(dep).is_some())
                    .cloned()
                    .collect();
                TaskDependencyInfo {
                    index,
                    node_id: self.node_ids()[index].clone(),
                    task: task.clone(),
                    dependencies,
                    is_ready: self.is_ready_at(index),
                    blocked_by: self.unmet_dependency_labels(index),
                }
            })
            .collect()
    }

    /// The ready task that should run next: lowest explicit priority
    /// value first, tasks without a priority after any with one, ties
    /// broken by snapshot position. `None` when nothing is ready.
    pub fn next_ready_task(&self) -> Option<ScheduledTask> {
        (0..self.len())
            .filter(|&index| self.is_ready_at(index))
            .min_by_key(|&index| Self::priority_key(&self.tasks()[index], index))
            .map(|index| self.scheduled(index))
    }

    /// Whether the task with the given node id may execute right now.
    pub fn can_execute(&self, id: &str) -> ExecutionEligibility {
        let Some(index) = self.index_of(id) else {
            return ExecutionEligibility::NotFound;
        };
        if self.tasks()[index].done {
            return ExecutionEligibility::AlreadyCompleted;
        }
        let blocked_by = self.unmet_dependency_labels(index);
        if blocked_by.is_empty() {
            ExecutionEligibility::Runnable
        } else {
            ExecutionEligibility::Blocked { blocked_by }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prd::Task;

    fn diamond() -> Vec<Task> {
        vec![
            Task::new("One").with_id("1"),
            Task::new("Two").with_id("2").with_dependencies(["1"]),
            Task::new("Three").with_id("3").with_dependencies(["1"]),
            Task::new("Four").with_id("4").with_dependencies(["2", "3"]),
        ]
    }

    #[test]
    fn test_ready_tasks_without_dependencies() {
        let tasks = vec![Task::new("A").with_id("a"), Task::new("B").with_id("b")];
        let ready = DependencyGraph::build(&tasks).ready_tasks();

        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].index, 0);
        assert_eq!(ready[1].index, 1);
    }

    #[test]
    fn test_ready_tasks_excludes_done() {
        let tasks = vec![
            Task::new("Done").with_id("done").completed(),
            Task::new("Open").with_id("open"),
        ];
        let ready = DependencyGraph::build(&tasks).ready_tasks();

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].node_id, "open");
    }

    #[test]
    fn test_ready_tasks_waits_for_dependencies() {
        let graph = DependencyGraph::build(&diamond());
        let ready = graph.ready_tasks();

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].node_id, "1");
    }

    #[test]
    fn test_ready_tasks_after_dependency_completes() {
        let mut tasks = diamond();
        tasks[0].done = true;
        let ready = DependencyGraph::build(&tasks).ready_tasks();

        let ids: Vec<&str> = ready.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_ready_tasks_is_idempotent() {
        let graph = DependencyGraph::build(&diamond());
        assert_eq!(graph.ready_tasks(), graph.ready_tasks());
    }

    #[test]
    fn test_blocked_tasks_carry_unmet_dependencies() {
        let graph = DependencyGraph::build(&diamond());
        let blocked = graph.blocked_tasks();

        assert_eq!(blocked.len(), 3);
        assert_eq!(blocked[0].node_id, "2");
        assert_eq!(blocked[0].blocked_by, vec!["One".to_string()]);
        assert_eq!(
            blocked[2].blocked_by,
            vec!["Two".to_string(), "Three".to_string()]
        );
    }

    #[test]
    fn test_blocked_by_unknown_dependency_uses_raw_id() {
        let tasks = vec![Task::new("A").with_id("a").with_dependencies(["ghost"])];
        let blocked = DependencyGraph::build(&tasks).blocked_tasks();

        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].blocked_by, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_dependency_info_covers_every_task() {
        let mut tasks = diamond();
        tasks[0].done = true;
        let info = DependencyGraph::build(&tasks).tasks_with_dependency_info();

        assert_eq!(info.len(), 4);
        // Done tasks are annotated but never ready.
        assert!(!info[0].is_ready);
        assert!(info[1].is_ready);
        assert!(!info[3].is_ready);
        assert_eq!(info[3].dependencies, vec!["2".to_string(), "3".to_string()]);
        assert_eq!(
            info[3].blocked_by,
            vec!["Two".to_string(), "Three".to_string()]
        );
    }

    #[test]
    fn test_next_ready_task_prefers_lowest_priority_value() {
        let tasks = vec![
            Task::new("Low").with_id("low").with_priority(3),
            Task::new("High").with_id("high").with_priority(1),
            Task::new("Mid").with_id("mid").with_priority(2),
        ];
        let next = DependencyGraph::build(&tasks).next_ready_task();

        assert_eq!(next.map(|t| t.node_id), Some("high".to_string()));
    }

    #[test]
    fn test_next_ready_task_missing_priority_sorts_last() {
        let tasks = vec![
            Task::new("Unranked").with_id("unranked"),
            Task::new("Ranked").with_id("ranked").with_priority(9),
        ];
        let next = DependencyGraph::build(&tasks).next_ready_task();

        assert_eq!(next.map(|t| t.node_id), Some("ranked".to_string()));
    }

    #[test]
    fn test_next_ready_task_ties_break_by_position() {
        let tasks = vec![
            Task::new("First").with_id("first").with_priority(5),
            Task::new("Second").with_id("second").with_priority(5),
        ];
        let next = DependencyGraph::build(&tasks).next_ready_task();

        assert_eq!(next.map(|t| t.node_id), Some("first".to_string()));
    }

    #[test]
    fn test_next_ready_task_none_when_all_blocked_or_done() {
        let tasks = vec![
            Task::new("Done").with_id("done").completed(),
            Task::new("Blocked").with_id("blocked").with_dependencies(["ghost"]),
        ];
        let next = DependencyGraph::build(&tasks).next_ready_task();

        assert!(next.is_none());
    }

    #[test]
    fn test_can_execute_variants() {
        let mut tasks = diamond();
        tasks[0].done = true;
        let graph = DependencyGraph::build(&tasks);

        assert!(graph.can_execute("2").can_execute());
        assert_eq!(graph.can_execute("ghost"), ExecutionEligibility::NotFound);
        assert_eq!(
            graph.can_execute("1"),
            ExecutionEligibility::AlreadyCompleted
        );
        let blocked = graph.can_execute("4");
        assert!(!blocked.can_execute());
        assert_eq!(
            blocked.reason(),
            Some("blocked by incomplete dependencies")
        );
    }
}
