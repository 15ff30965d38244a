use core::cmp::Reverse;
use core::fmt::Debug;
use std::fmt::Write;

use priority_queue::PriorityQueue;

/// A directed edge of a control flow graph. Nodes are dense indices, the
/// kind carries the label (fall-through, branch outcome, call, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge<K> {
    pub source: usize,
    pub target: usize,
    pub kind: K,
}

/// The direction of a dataflow analysis. Backward analyses traverse the
/// edges of the graph in the opposite direction, starting from the exits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Read-only view of a graph over statements (or any other kind of nodes)
/// with labelled edges. The graph might be a multigraph, i.e., there might
/// be multiple edges between the same pair of nodes with different labels.
pub trait ControlFlowGraph {
    type EdgeKind: Clone + Debug;

    fn node_count(&self) -> usize;

    /// The nodes where the forward analyses start.
    fn entries(&self) -> &[usize];

    /// The nodes where the backward analyses start.
    fn exits(&self) -> &[usize];

    fn in_edges(&self, node: usize) -> &[Edge<Self::EdgeKind>];
    fn out_edges(&self, node: usize) -> &[Edge<Self::EdgeKind>];

    fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_edges(node).iter().map(|e| e.target)
    }

    fn predecessors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.in_edges(node).iter().map(|e| e.source)
    }

    /// The edges along which facts flow into `node` when analysing in the
    /// given direction.
    fn flow_in_edges(&self, node: usize, dir: Direction) -> &[Edge<Self::EdgeKind>] {
        match dir {
            Direction::Forward => self.in_edges(node),
            Direction::Backward => self.out_edges(node),
        }
    }

    /// The nodes that need to be revisited when the facts of `node` change.
    fn flow_successors(&self, node: usize, dir: Direction) -> impl Iterator<Item = usize> + '_ {
        let edges = match dir {
            Direction::Forward => self.out_edges(node),
            Direction::Backward => self.in_edges(node),
        };
        edges.iter().map(move |e| match dir {
            Direction::Forward => e.target,
            Direction::Backward => e.source,
        })
    }

    fn boundaries(&self, dir: Direction) -> &[usize] {
        match dir {
            Direction::Forward => self.entries(),
            Direction::Backward => self.exits(),
        }
    }
}

/// Adjacency list based graph with labelled edges. Language specific
/// control flow graphs wrap this type and add the mapping between the
/// nodes and the statements.
#[derive(Clone, Debug)]
pub struct LabelledGraph<K> {
    in_edges: Vec<Vec<Edge<K>>>,
    out_edges: Vec<Vec<Edge<K>>>,
    entries: Vec<usize>,
    exits: Vec<usize>,
}

impl<K> Default for LabelledGraph<K> {
    fn default() -> Self {
        Self {
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            entries: Vec::new(),
            exits: Vec::new(),
        }
    }
}

impl<K: Clone + Debug> LabelledGraph<K> {
    pub fn new(size: usize) -> Self {
        let mut graph = Self::default();
        for _ in 0..size {
            graph.new_node();
        }
        graph
    }

    pub fn new_node(&mut self) -> usize {
        self.in_edges.push(Vec::new());
        self.out_edges.push(Vec::new());
        self.in_edges.len() - 1
    }

    pub fn add_edge(&mut self, source: usize, target: usize, kind: K) -> &mut Self {
        let edge = Edge {
            source,
            target,
            kind,
        };
        self.out_edges[source].push(edge.clone());
        self.in_edges[target].push(edge);
        self
    }

    pub fn add_entry(&mut self, node: usize) -> &mut Self {
        if !self.entries.contains(&node) {
            self.entries.push(node);
        }
        self
    }

    pub fn add_exit(&mut self, node: usize) -> &mut Self {
        if !self.exits.contains(&node) {
            self.exits.push(node);
        }
        self
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.iter().map(Vec::len).sum()
    }
}

impl<K: Clone + Debug> ControlFlowGraph for LabelledGraph<K> {
    type EdgeKind = K;

    fn node_count(&self) -> usize {
        self.in_edges.len()
    }

    fn entries(&self) -> &[usize] {
        &self.entries
    }

    fn exits(&self) -> &[usize] {
        &self.exits
    }

    fn in_edges(&self, node: usize) -> &[Edge<K>] {
        &self.in_edges[node]
    }

    fn out_edges(&self, node: usize) -> &[Edge<K>] {
        &self.out_edges[node]
    }
}

/// Render the graph in graphviz format. Edge labels are printed using the
/// debug representation of the edge kinds.
pub fn print<Cfg, NodePrinter>(name: Option<&str>, cfg: &Cfg, printer: NodePrinter) -> String
where
    Cfg: ControlFlowGraph,
    NodePrinter: Fn(usize) -> String,
{
    let mut output = format!("digraph {} {{\n", name.unwrap_or("CFG"));
    for node in 0..cfg.node_count() {
        writeln!(output, "  Node_{node}[label=\"{}\"]", printer(node).replace('"', "\\\"")).unwrap();
    }
    output.push('\n');
    for node in 0..cfg.node_count() {
        for edge in cfg.out_edges(node) {
            writeln!(
                output,
                "  Node_{} -> Node_{}[label=\"{:?}\"]",
                edge.source, edge.target, edge.kind
            )
            .unwrap();
        }
    }
    output.push_str("}\n");
    output
}

/// A worklist that pops the nodes in reverse post-order of the traversal
/// direction. Pushing a node that is already queued is a no-op, so the
/// worklist behaves like a set-backed queue.
pub struct RPOWorklist {
    queue: PriorityQueue<usize, Reverse<usize>>,
    rpo_order: Vec<usize>,
}

impl RPOWorklist {
    pub fn new<Cfg: ControlFlowGraph>(cfg: &Cfg, dir: Direction) -> Self {
        let node_num = cfg.node_count();
        let mut order = Vec::with_capacity(node_num);
        let mut visited = vec![false; node_num];

        // Iterative DFS, every stack frame remembers the next edge to visit.
        // Nodes not reachable from the boundaries are ordered last.
        let mut roots: Vec<usize> = cfg.boundaries(dir).to_vec();
        roots.extend(0..node_num);
        for root in roots {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut post_order = Vec::new();
            let mut stack = vec![(root, 0_usize)];
            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                if let Some(succ) = cfg.flow_successors(node, dir).nth(*next) {
                    *next += 1;
                    if !visited[succ] {
                        visited[succ] = true;
                        stack.push((succ, 0));
                    }
                } else {
                    post_order.push(node);
                    stack.pop();
                }
            }
            order.extend(post_order.into_iter().rev());
        }

        let mut rpo_order = vec![0; node_num];
        for (idx, &node) in order.iter().enumerate() {
            rpo_order[node] = idx;
        }

        Self {
            queue: PriorityQueue::with_capacity(node_num),
            rpo_order,
        }
    }

    pub fn push(&mut self, node: usize) {
        self.queue.push(node, Reverse(self.rpo_order[node]));
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.queue.pop().map(|(node, _)| node)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn get_rpo_order(&self, node: usize) -> usize {
        self.rpo_order[node]
    }
}
