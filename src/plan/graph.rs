//! Dependency graph over plan nodes.
//!
//! Edges point from a consumer to what it depends on, so roots (in-degree 0)
//! are the requested measures and leaves are computed first.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{QueryError, QueryResult};

#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    graph: DiGraph<N, ()>,
    node_index: HashMap<N, NodeIndex>,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }
}

impl<N: Clone + Eq + Hash + Display> DependencyGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for `node`.
    pub fn add_node(&mut self, node: N) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node) {
            idx
        } else {
            let idx = self.graph.add_node(node.clone());
            self.node_index.insert(node, idx);
            idx
        }
    }

    /// Record that `consumer` needs `dependency` first.
    pub fn add_dependency(&mut self, consumer: N, dependency: N) {
        let from = self.add_node(consumer);
        let to = self.add_node(dependency);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, node: &N) -> bool {
        self.node_index.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.graph.node_indices().map(|i| &self.graph[i])
    }

    pub fn index_of(&self, node: &N) -> Option<usize> {
        self.node_index.get(node).map(|i| i.index())
    }

    /// Direct dependencies of `node`, in insertion order.
    pub fn dependencies(&self, node: &N) -> Vec<&N> {
        let Some(&idx) = self.node_index.get(node) else {
            return vec![];
        };
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        deps.sort();
        deps.into_iter().map(|i| &self.graph[i]).collect()
    }

    /// Nodes nothing depends on.
    pub fn roots(&self) -> Vec<&N> {
        self.graph
            .node_indices()
            .filter(|&i| {
                self.graph
                    .neighbors_directed(i, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|i| &self.graph[i])
            .collect()
    }

    /// Strongly connected components that form a cycle.
    pub fn detect_cycles(&self) -> Vec<Vec<N>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                // A single node is only a cycle if it has a self-loop
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| scc.into_iter().map(|i| self.graph[i].clone()).collect())
            .collect()
    }

    pub fn validate_no_cycles(&self) -> QueryResult<()> {
        match self.detect_cycles().into_iter().next() {
            None => Ok(()),
            Some(mut cycle) => {
                cycle.sort_by_key(|n| self.node_index[n]);
                let mut names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                if let Some(first) = names.first().cloned() {
                    names.push(first);
                }
                Err(QueryError::CyclicDependency(names))
            }
        }
    }

    /// Topological layers, dependencies first. Nodes of one layer do not
    /// depend on each other; within a layer nodes keep insertion order.
    pub fn execution_layers(&self) -> QueryResult<Vec<Vec<N>>> {
        self.validate_no_cycles()?;

        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|i| (i, self.graph.neighbors_directed(i, Direction::Outgoing).count()))
            .collect();
        let mut done: HashSet<NodeIndex> = HashSet::new();
        let mut layers = Vec::new();

        while done.len() < self.graph.node_count() {
            let ready: Vec<NodeIndex> = self
                .graph
                .node_indices()
                .filter(|i| !done.contains(i) && pending[i] == 0)
                .collect();
            if ready.is_empty() {
                // Unreachable once cycles are rejected.
                return Err(QueryError::CyclicDependency(vec![]));
            }
            for &idx in &ready {
                done.insert(idx);
                for consumer in self.graph.neighbors_directed(idx, Direction::Incoming) {
                    if let Some(count) = pending.get_mut(&consumer) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
            layers.push(ready.into_iter().map(|i| self.graph[i].clone()).collect());
        }
        Ok(layers)
    }

    /// Flat execution order, dependencies first.
    pub fn topological_order(&self) -> QueryResult<Vec<N>> {
        Ok(self.execution_layers()?.into_iter().flatten().collect())
    }

    /// Text tree from the roots, one tab of indentation per level.
    pub fn print(&self, label: impl Fn(usize, &N) -> String) -> String {
        let mut out = String::new();
        let mut path = Vec::new();
        for root in self.graph.node_indices().filter(|&i| {
            self.graph
                .neighbors_directed(i, Direction::Incoming)
                .next()
                .is_none()
        }) {
            self.print_node(root, 0, &label, &mut path, &mut out);
        }
        out
    }

    fn print_node(
        &self,
        idx: NodeIndex,
        depth: usize,
        label: &impl Fn(usize, &N) -> String,
        path: &mut Vec<NodeIndex>,
        out: &mut String,
    ) {
        out.push_str(&"\t".repeat(depth));
        out.push_str(&label(idx.index(), &self.graph[idx]));
        out.push('\n');
        if path.contains(&idx) {
            return;
        }
        path.push(idx);
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        deps.sort();
        for dep in deps {
            self.print_node(dep, depth + 1, label, path, out);
        }
        path.pop();
    }
}
