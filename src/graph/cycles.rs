//! Cycle detection over dependency edges.

use std::collections::HashMap;

use super::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Outcome of cycle detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Whether the dependency edges form at least one directed cycle.
    pub has_cycle: bool,
    /// Node identifiers on the discovered cycle, in traversal order.
    /// Empty when acyclic.
    pub cycle_nodes: Vec<String>,
}

impl CycleReport {
    fn acyclic() -> Self {
        Self {
            has_cycle: false,
            cycle_nodes: Vec::new(),
        }
    }
}

impl DependencyGraph {
    /// Depth-first search over task -> dependency edges with three-color
    /// marking; reaching an in-progress node closes a cycle.
    ///
    /// Reports every node on the first cycle found. A multi-cycle graph
    /// reports only one of them, which is sufficient to fail the run.
    pub fn detect_cycles(&self) -> CycleReport {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();

        for id in self.node_ids() {
            if marks.contains_key(id.as_str()) {
                continue;
            }
            if let Some(cycle) = self.visit(id, &mut marks, &mut path) {
                return CycleReport {
                    has_cycle: true,
                    cycle_nodes: cycle,
                };
            }
        }

        CycleReport::acyclic()
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        marks.insert(node, Mark::InProgress);
        path.push(node);

        // Dependencies are traversed in declaration order; ids that
        // resolve to no task are validation's concern, not a cycle.
        if let Some(index) = self.index_of(node) {
            for dep in &self.tasks()[index].depends_on {
                match marks.get(dep.as_str()) {
                    Some(Mark::InProgress) => {
                        let start = path
                            .iter()
                            .position(|n| *n == dep.as_str())
                            .unwrap_or(0);
                        return Some(path[start..].iter().map(|n| n.to_string()).collect());
                    }
                    Some(Mark::Done) => {}
                    None => {
                        if self.index_of(dep).is_some() {
                            if let Some(cycle) = self.visit(dep, marks, path) {
                                return Some(cycle);
                            }
                        }
                    }
                }
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        None
    }
}
