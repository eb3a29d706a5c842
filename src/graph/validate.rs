//! Static validation of task dependency declarations.

use std::fmt;

use serde::Serialize;

use super::DependencyGraph;

/// Kind of dependency declaration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyErrorKind {
    /// A declared dependency id does not exist among task ids.
    MissingDependency,
    /// The dependency edges form a directed cycle.
    Cycle,
    /// A task lists its own id as a dependency.
    SelfReference,
    /// A task declares dependencies but has no id of its own, so nothing
    /// else could ever depend on it by a stable reference.
    MissingId,
}

impl DependencyErrorKind {
    /// Stable label for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDependency => "missing_dependency",
            Self::Cycle => "cycle",
            Self::SelfReference => "self_reference",
            Self::MissingId => "missing_id",
        }
    }
}

impl fmt::Display for DependencyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dependency declaration violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyError {
    /// What went wrong.
    pub kind: DependencyErrorKind,
    /// Node id of the offending task.
    pub task_id: String,
    /// Title of the offending task.
    pub task_title: String,
    /// Human-readable description of the violation.
    pub detail: String,
}

impl fmt::Display for DependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Outcome of validating a task list's dependency declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Whether no violations were found.
    pub is_valid: bool,
    /// All violations, in task order.
    pub errors: Vec<DependencyError>,
}

impl DependencyGraph {
    /// Check every task's dependency declarations.
    ///
    /// Emits `missing_dependency` for each `dependsOn` entry that
    /// resolves to no task, `self_reference` when a task depends on its
    /// own id, and `missing_id` when a task declares dependencies but
    /// has no explicit id. Cycle detection is a separate pass
    /// ([`detect_cycles`](Self::detect_cycles)); both must pass before
    /// scheduling proceeds.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        for (index, task) in self.tasks().iter().enumerate() {
            let node_id = &self.node_ids()[index];

            for dep in &task.depends_on {
                if task.id.as_deref() == Some(dep.as_str()) {
                    errors.push(DependencyError {
                        kind: DependencyErrorKind::SelfReference,
                        task_id: node_id.clone(),
                        task_title: task.title.clone(),
                        detail: format!("task \"{}\" depends on itself", task.title),
                    });
                } else if self.index_of(dep).is_none() {
                    errors.push(DependencyError {
                        kind: DependencyErrorKind::MissingDependency,
                        task_id: node_id.clone(),
                        task_title: task.title.clone(),
                        detail: format!(
                            "task \"{}\" depends on unknown task \"{}\"",
                            task.title, dep
                        ),
                    });
                }
            }

            if !task.depends_on.is_empty() && task.id.is_none() {
                errors.push(DependencyError {
                    kind: DependencyErrorKind::MissingId,
                    task_id: node_id.clone(),
                    task_title: task.title.clone(),
                    detail: format!(
                        "task \"{}\" declares dependencies but has no id",
                        task.title
                    ),
                });
            }
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Run validation and cycle detection together.
    ///
    /// This is the gate a scheduling run must pass: either failure is
    /// fatal. Cycle participants are reported as a single `cycle` error
    /// naming the closed path.
    pub fn preflight(&self) -> ValidationReport {
        let mut report = self.validate();

        let cycles = self.detect_cycles();
        if cycles.has_cycle {
            let first = cycles.cycle_nodes.first();
            let (task_id, task_title) = match first.and_then(|id| self.task_by_id(id).map(|t| (id, t)))
            {
                Some((id, task)) => (id.clone(), task.title.clone()),
                None => (String::new(), String::new()),
            };
            report.errors.push(DependencyError {
                kind: DependencyErrorKind::Cycle,
                task_id,
                task_title,
                detail: format!(
                    "dependency cycle detected: {}",
                    cycles.cycle_nodes.join(" -> ")
                ),
            });
            report.is_valid = false;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prd::Task;

    #[test]
    fn test_validate_accepts_well_formed_list() {
        let tasks = vec![
            Task::new("A").with_id("a"),
            Task::new("B").with_id("b").with_dependencies(["a"]),
        ];
        let report = DependencyGraph::build(&tasks).validate();

        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_validate_missing_dependency_is_single_error() {
        let tasks = vec![
            Task::new("A").with_id("a"),
            Task::new("B").with_id("b").with_dependencies(["ghost"]),
        ];
        let report = DependencyGraph::build(&tasks).validate();

        assert!(!report.is_valid);
        let missing: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == DependencyErrorKind::MissingDependency)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].detail.contains("ghost"));
        assert_eq!(missing[0].task_id, "b");
    }

    #[test]
    fn test_validate_self_reference() {
        let tasks = vec![Task::new("Loop").with_id("loop").with_dependencies(["loop"])];
        let report = DependencyGraph::build(&tasks).validate();

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DependencyErrorKind::SelfReference);
    }

    #[test]
    fn test_validate_missing_id() {
        let tasks = vec![
            Task::new("A").with_id("a"),
            Task::new("No id").with_dependencies(["a"]),
        ];
        let report = DependencyGraph::build(&tasks).validate();

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DependencyErrorKind::MissingId);
        assert_eq!(report.errors[0].task_id, "__index_1");
    }

    #[test]
    fn test_validate_does_not_report_cycles() {
        // Cycles are a separate pass; validate stays silent on them.
        let tasks = vec![
            Task::new("A").with_id("a").with_dependencies(["b"]),
            Task::new("B").with_id("b").with_dependencies(["a"]),
        ];
        let report = DependencyGraph::build(&tasks).validate();

        assert!(report.is_valid);
    }

    #[test]
    fn test_preflight_reports_cycles() {
        let tasks = vec![
            Task::new("A").with_id("a").with_dependencies(["b"]),
            Task::new("B").with_id("b").with_dependencies(["a"]),
        ];
        let report = DependencyGraph::build(&tasks).preflight();

        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.kind == DependencyErrorKind::Cycle));
    }

    #[test]
    fn test_preflight_combines_all_violations() {
        let tasks = vec![
            Task::new("A").with_id("a").with_dependencies(["b", "ghost"]),
            Task::new("B").with_id("b").with_dependencies(["a"]),
        ];
        let report = DependencyGraph::build(&tasks).preflight();

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
    }
}
