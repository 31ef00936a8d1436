// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Undirected adjacency graph over input shape ids.
//!
//! The graph stores edges only; a vertex exists once an edge touches it.
//! The adjacency builder adds a self-loop for every shape, which is what
//! puts isolated shapes into a component of their own.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

/// Position of a shape in the input list
pub type VertexId = usize;

/// A set of mutually reachable vertices, sorted ascending
pub type Component = Vec<VertexId>;

/// Simple undirected graph
#[derive(Debug, Clone, Default)]
pub struct UndirectedGraph {
    edges: FxHashMap<VertexId, FxHashSet<VertexId>>,
}

impl UndirectedGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            edges: FxHashMap::default(),
        }
    }

    /// Add the edge `s, t` and its mirror `t, s`
    pub fn add_edge(&mut self, s: VertexId, t: VertexId) {
        self.edges.entry(s).or_default().insert(t);
        self.edges.entry(t).or_default().insert(s);
    }

    /// Outgoing targets of `v`; empty for unknown vertices
    pub fn targets(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.edges.get(&v).into_iter().flatten().copied()
    }

    /// All vertices, ascending
    pub fn vertices(&self) -> Vec<VertexId> {
        let mut vertices: Vec<VertexId> = self.edges.keys().copied().collect();
        vertices.sort_unstable();
        vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.edges.len()
    }

    /// Undirected edges between distinct vertices, each counted once
    pub fn edge_count(&self) -> usize {
        self.edges
            .iter()
            .map(|(s, targets)| targets.iter().filter(|t| *t > s).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterative depth-first search from `v`
    ///
    /// Returns vertices in visit order. The start vertex is included as the
    /// first element; callers computing components add it regardless.
    pub fn dfs(&self, v: VertexId) -> Vec<VertexId> {
        let mut stack = vec![v];
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();

        while let Some(s) = stack.pop() {
            if seen.insert(s) {
                stack.extend(self.targets(s).filter(|t| !seen.contains(t)));
                order.push(s);
            }
        }

        order
    }

    /// Connected components in order of their smallest vertex
    pub fn components(&self) -> Vec<Component> {
        let mut seen: FxHashSet<VertexId> = FxHashSet::default();
        let mut components = Vec::new();

        for v in self.vertices() {
            if seen.contains(&v) {
                continue;
            }

            let mut component = self.dfs(v);
            if !component.contains(&v) {
                component.push(v);
            }
            component.sort_unstable();

            seen.extend(component.iter().copied());
            components.push(component);
        }

        components
    }
}

/// Verify that `components` partition `[0, n)` exactly
///
/// Every id must be in range and appear once, and the sizes must sum to `n`.
pub fn check_partition(components: &[Component], n: usize) -> Result<()> {
    let total: usize = components.iter().map(|c| c.len()).sum();
    let mut seen = vec![false; n];

    for component in components {
        for &v in component {
            if v >= n {
                return Err(Error::invariant(
                    n,
                    total,
                    format!("vertex {} is outside the input range", v),
                ));
            }
            if seen[v] {
                return Err(Error::invariant(
                    n,
                    total,
                    format!("vertex {} appears in more than one component", v),
                ));
            }
            seen[v] = true;
        }
    }

    if total != n {
        let missing = seen.iter().position(|s| !s).unwrap_or(n);
        return Err(Error::invariant(
            n,
            total,
            format!("vertex {} is in no component", missing),
        ));
    }

    Ok(())
}
