//! Topological ordering and level-based parallel grouping.

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{DependencyGraph, ScheduledTask};

impl DependencyGraph {
    /// All tasks ordered so every task appears after its dependencies.
    ///
    /// Any ordering satisfying that partial order is acceptable;
    /// independent tasks keep no particular relative order beyond it.
    pub fn topological_order(&self) -> Vec<ScheduledTask> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.len(), 0);
        let nodes: Vec<NodeIndex> = (0..self.len()).map(|index| graph.add_node(index)).collect();
        for (index, task) in self.tasks().iter().enumerate() {
            for dep in &task.depends_on {
                if let Some(dep_index) = self.index_of(dep) {
                    if dep_index != index {
                        graph.add_edge(nodes[dep_index], nodes[index], ());
                    }
                }
            }
        }

        let order: Vec<usize> = match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|node| graph[node]).collect(),
            // Callers must cycle-check before ordering; a cyclic graph
            // falls back to snapshot order.
            Err(_) => (0..self.len()).collect(),
        };

        order.into_iter().map(|index| self.scheduled(index)).collect()
    }

    /// Not-done tasks in topological order: the sequential execution
    /// plan used when parallelism is disabled.
    pub fn execution_order(&self) -> Vec<ScheduledTask> {
        self.topological_order()
            .into_iter()
            .filter(|scheduled| !scheduled.task.done)
            .collect()
    }

    /// Partition the not-done tasks into ordered levels.
    ///
    /// Level N contains the tasks whose dependencies are all either
    /// already done or placed in a level before N; no two tasks in the
    /// same level depend on each other. Within a level, tasks sort by
    /// priority ascending (missing priority after any explicit value),
    /// ties broken by snapshot position.
    ///
    /// The graph must pass [`validate`](Self::validate) and
    /// [`detect_cycles`](Self::detect_cycles) first; on an invalid graph
    /// the unresolvable remainder is silently left out of the plan.
    pub fn parallel_execution_groups(&self) -> Vec<Vec<ScheduledTask>> {
        let mut groups: Vec<Vec<ScheduledTask>> = Vec::new();
        let mut placed: HashSet<usize> = HashSet::new();
        let mut remaining: Vec<usize> = (0..self.len())
            .filter(|&index| !self.tasks()[index].done)
            .collect();

        while !remaining.is_empty() {
            let mut level: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&index| {
                    self.tasks()[index].depends_on.iter().all(|dep| {
                        self.dependency_done(dep)
                            || self
                                .index_of(dep)
                                .map(|dep_index| placed.contains(&dep_index))
                                .unwrap_or(false)
                    })
                })
                .collect();

            if level.is_empty() {
                break;
            }

            level.sort_by_key(|&index| Self::priority_key(&self.tasks()[index], index));
            placed.extend(level.iter().copied());
            remaining.retain(|index| !placed.contains(index));
            groups.push(level.into_iter().map(|index| self.scheduled(index)).collect());
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prd::Task;

    fn group_ids(groups: &[Vec<ScheduledTask>]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|group| group.iter().map(|t| t.node_id.clone()).collect())
            .collect()
    }

    #[test]
    fn test_independent_tasks_form_one_group() {
        let tasks = vec![
            Task::new("A").with_id("a"),
            Task::new("B").with_id("b"),
            Task::new("C").with_id("c"),
        ];
        let groups = DependencyGraph::build(&tasks).parallel_execution_groups();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_chain_forms_singleton_groups_in_order() {
        let tasks = vec![
            Task::new("A").with_id("a"),
            Task::new("B").with_id("b").with_dependencies(["a"]),
            Task::new("C").with_id("c").with_dependencies(["b"]),
        ];
        let graph = DependencyGraph::build(&tasks);

        let groups = graph.parallel_execution_groups();
        assert_eq!(
            group_ids(&groups),
            vec![
                vec!["a".to_string()],
                vec!["b".to_string()],
                vec!["c".to_string()]
            ]
        );

        let order: Vec<String> = graph
            .execution_order()
            .into_iter()
            .map(|t| t.node_id)
            .collect();
        assert_eq!(order, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_diamond_levels() {
        let tasks = vec![
            Task::new("One").with_id("1"),
            Task::new("Two").with_id("2").with_dependencies(["1"]),
            Task::new("Three").with_id("3").with_dependencies(["1"]),
            Task::new("Four").with_id("4").with_dependencies(["2", "3"]),
        ];
        let graph = DependencyGraph::build(&tasks);
        assert!(!graph.detect_cycles().has_cycle);

        let groups = group_ids(&graph.parallel_execution_groups());
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], vec!["1".to_string()]);
        let mut middle = groups[1].clone();
        middle.sort();
        assert_eq!(middle, vec!["2".to_string(), "3".to_string()]);
        assert_eq!(groups[2], vec!["4".to_string()]);
    }

    #[test]
    fn test_group_sorts_by_priority_ascending() {
        let tasks = vec![
            Task::new("P3").with_id("p3").with_priority(3),
            Task::new("P1").with_id("p1").with_priority(1),
            Task::new("P2").with_id("p2").with_priority(2),
        ];
        let groups = group_ids(&DependencyGraph::build(&tasks).parallel_execution_groups());

        assert_eq!(
            groups,
            vec![vec!["p1".to_string(), "p2".to_string(), "p3".to_string()]]
        );
    }

    #[test]
    fn test_group_missing_priority_sorts_last() {
        let tasks = vec![
            Task::new("Unranked").with_id("u"),
            Task::new("Ranked").with_id("r").with_priority(50),
        ];
        let groups = group_ids(&DependencyGraph::build(&tasks).parallel_execution_groups());

        assert_eq!(groups, vec![vec!["r".to_string(), "u".to_string()]]);
    }

    #[test]
    fn test_done_dependencies_already_satisfied() {
        let tasks = vec![
            Task::new("Done").with_id("done").completed(),
            Task::new("Next").with_id("next").with_dependencies(["done"]),
        ];
        let groups = group_ids(&DependencyGraph::build(&tasks).parallel_execution_groups());

        // The done task is excluded; its dependent starts in the first level.
        assert_eq!(groups, vec![vec!["next".to_string()]]);
    }

    #[test]
    fn test_execution_order_excludes_done_tasks() {
        let tasks = vec![
            Task::new("Done").with_id("done").completed(),
            Task::new("Open").with_id("open").with_dependencies(["done"]),
        ];
        let order: Vec<String> = DependencyGraph::build(&tasks)
            .execution_order()
            .into_iter()
            .map(|t| t.node_id)
            .collect();

        assert_eq!(order, vec!["open".to_string()]);
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let tasks = vec![
            Task::new("Leaf").with_id("leaf").with_dependencies(["root"]),
            Task::new("Root").with_id("root"),
        ];
        let order: Vec<String> = DependencyGraph::build(&tasks)
            .topological_order()
            .into_iter()
            .map(|t| t.node_id)
            .collect();

        let root_pos = order.iter().position(|id| id == "root").expect("root");
        let leaf_pos = order.iter().position(|id| id == "leaf").expect("leaf");
        assert!(root_pos < leaf_pos);
    }
}
