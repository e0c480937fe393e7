//! Topological Sort
//!
//! Orders the nodes referenced by a set of directed edges so that every
//! producer precedes its consumers (Kahn's algorithm).
//!
//! Nodes that sit on a cycle never reach an in-degree of zero and are left
//! out of [`TopoResult::order`]. The sort does not report this itself;
//! callers compare [`TopoResult::order`] against [`TopoResult::node_count`]
//! (see [`TopoResult::is_complete`]).

use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A directed edge `from -> to`: `from` must be ordered before `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge<T> {
    pub from: T,
    pub to: T,
}

impl<T> GraphEdge<T> {
    #[inline]
    pub fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

impl<T> From<(T, T)> for GraphEdge<T> {
    #[inline]
    fn from((from, to): (T, T)) -> Self {
        Self { from, to }
    }
}

/// Output of [`topological_sort`].
#[derive(Debug, Clone, Default)]
pub struct TopoResult<T> {
    /// Nodes in dependency order. Nodes on a cycle are omitted.
    pub order: Vec<T>,
    /// Number of distinct nodes referenced by the input edges.
    pub node_count: usize,
}

impl<T> TopoResult<T> {
    /// `true` when every referenced node received a position in the order.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.order.len() == self.node_count
    }

    /// Number of nodes dropped because they sit on (or behind) a cycle.
    #[inline]
    #[must_use]
    pub fn omitted(&self) -> usize {
        self.node_count - self.order.len()
    }
}

/// Sorts the nodes of a directed edge set so producers precede consumers.
///
/// Ties are broken by first appearance in `edges`, which keeps the result
/// deterministic for a given input.
pub fn topological_sort<T, E>(edges: &[E]) -> TopoResult<T>
where
    T: Copy + Eq + Hash,
    E: Copy + Into<GraphEdge<T>>,
{
    // Dense indices in first-appearance order
    let mut index_of: FxHashMap<T, usize> = FxHashMap::default();
    let mut nodes: Vec<T> = Vec::new();
    let mut successors: Vec<Vec<usize>> = Vec::new();
    let mut in_degree: Vec<usize> = Vec::new();

    let mut intern = |node: T,
                      nodes: &mut Vec<T>,
                      successors: &mut Vec<Vec<usize>>,
                      in_degree: &mut Vec<usize>|
     -> usize {
        *index_of.entry(node).or_insert_with(|| {
            nodes.push(node);
            successors.push(Vec::new());
            in_degree.push(0);
            nodes.len() - 1
        })
    };

    for &edge in edges {
        let GraphEdge { from, to } = edge.into();
        let from = intern(from, &mut nodes, &mut successors, &mut in_degree);
        let to = intern(to, &mut nodes, &mut successors, &mut in_degree);
        successors[from].push(to);
        in_degree[to] += 1;
    }

    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(current) = queue.pop_front() {
        order.push(nodes[current]);
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    TopoResult {
        order,
        node_count: nodes.len(),
    }
}
