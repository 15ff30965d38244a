use core::fmt::Debug;
use core::hash::Hash;
use std::collections::{HashMap, HashSet};

/// A call edge: the call site `call_site` may invoke `callee`. The kind
/// describes how the call is dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallEdge<C, M, K> {
    pub kind: K,
    pub call_site: C,
    pub callee: M,
}

/// A call graph that is built incrementally. The set of reachable methods
/// only grows, and the order of discovery is preserved so iterating the
/// graph is deterministic.
///
/// The graph is generic over the representation of call sites and methods,
/// so the same structure serves context-insensitive and context-sensitive
/// analyses.
#[derive(Clone, Debug)]
pub struct CallGraph<C, M, K> {
    entry_methods: Vec<M>,
    reachable: Vec<M>,
    reachable_set: HashSet<M>,
    edges: Vec<CallEdge<C, M, K>>,
    edge_set: HashSet<CallEdge<C, M, K>>,
    out_edges: HashMap<C, Vec<usize>>,
    in_edges: HashMap<M, Vec<usize>>,
}

impl<C, M, K> Default for CallGraph<C, M, K> {
    fn default() -> Self {
        Self {
            entry_methods: Vec::new(),
            reachable: Vec::new(),
            reachable_set: HashSet::new(),
            edges: Vec::new(),
            edge_set: HashSet::new(),
            out_edges: HashMap::new(),
            in_edges: HashMap::new(),
        }
    }
}

impl<C, M, K> CallGraph<C, M, K>
where
    C: Copy + Eq + Hash + Debug,
    M: Copy + Eq + Hash + Debug,
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry methods are reachable by definition.
    pub fn add_entry_method(&mut self, method: M) {
        if !self.entry_methods.contains(&method) {
            self.entry_methods.push(method);
        }
        self.add_reachable_method(method);
    }

    pub fn entry_methods(&self) -> &[M] {
        &self.entry_methods
    }

    /// Returns true when the method was not reachable before.
    pub fn add_reachable_method(&mut self, method: M) -> bool {
        if self.reachable_set.insert(method) {
            self.reachable.push(method);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, method: M) -> bool {
        self.reachable_set.contains(&method)
    }

    /// The reachable methods in the order of their discovery.
    pub fn reachable_methods(&self) -> &[M] {
        &self.reachable
    }

    /// Returns true when the edge is new.
    pub fn add_edge(&mut self, edge: CallEdge<C, M, K>) -> bool {
        if !self.edge_set.insert(edge) {
            return false;
        }
        let id = self.edges.len();
        self.edges.push(edge);
        self.out_edges.entry(edge.call_site).or_default().push(id);
        self.in_edges.entry(edge.callee).or_default().push(id);
        true
    }

    pub fn has_edge(&self, edge: &CallEdge<C, M, K>) -> bool {
        self.edge_set.contains(edge)
    }

    pub fn edges(&self) -> impl Iterator<Item = &CallEdge<C, M, K>> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges_out_of(&self, call_site: C) -> impl Iterator<Item = &CallEdge<C, M, K>> {
        self.out_edges
            .get(&call_site)
            .into_iter()
            .flatten()
            .map(|&id| &self.edges[id])
    }

    pub fn edges_into(&self, callee: M) -> impl Iterator<Item = &CallEdge<C, M, K>> {
        self.in_edges
            .get(&callee)
            .into_iter()
            .flatten()
            .map(|&id| &self.edges[id])
    }

    pub fn callees_of(&self, call_site: C) -> impl Iterator<Item = M> + '_ {
        self.edges_out_of(call_site).map(|e| e.callee)
    }

    pub fn callers_of(&self, callee: M) -> impl Iterator<Item = C> + '_ {
        self.edges_into(callee).map(|e| e.call_site)
    }
}
