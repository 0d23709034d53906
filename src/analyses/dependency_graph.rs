//! Dependency graph over CHR constraint declarations (§4.1.1).

use crate::catalog::{Catalog, ConstraintId};
use crate::program::Program;
use std::collections::{HashMap, HashSet};

/// Directed graph over [`ConstraintId`] nodes: an edge `h -> c` means some
/// rule has `h` in its head and calls `c` somewhere in its body.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<ConstraintId, HashSet<ConstraintId>>,
}

impl DependencyGraph {
    /// Builds the graph by walking every rule body for CHR calls and fanning
    /// an edge out from each head constraint of that rule (§4.1.1).
    pub fn build(program: &Program, catalog: &Catalog) -> Self {
        let mut graph = DependencyGraph::default();
        for rule in &program.rules {
            let heads: Vec<ConstraintId> = rule
                .head()
                .iter()
                .filter_map(|c| catalog.lookup(&c.constraint))
                .collect();
            let mut called = Vec::new();
            crate::visitor::walk_body(
                &rule.body,
                &mut |b| {
                    if let crate::ast::Body::ChrCall(call) = b {
                        if let Some(id) = catalog.lookup(&call.constraint) {
                            called.push(id);
                        }
                    }
                },
                &mut |_| {},
            );
            for h in &heads {
                for c in &called {
                    graph.edges.entry(*h).or_default().insert(*c);
                }
            }
        }
        graph
    }

    pub fn successors(&self, id: ConstraintId) -> impl Iterator<Item = ConstraintId> + '_ {
        self.edges.get(&id).into_iter().flatten().copied()
    }

    /// Declarations with no incoming edge from any rule body: *never-activated*
    /// candidates (§4.1.1).
    pub fn never_activated(&self, catalog: &Catalog) -> Vec<ConstraintId> {
        let called: HashSet<ConstraintId> = self.edges.values().flatten().copied().collect();
        catalog
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !called.contains(id))
            .collect()
    }
}
