use std::collections::HashMap;

use analysis::cfg::{ControlFlowGraph, Edge, LabelledGraph};
use itertools::Itertools;
use log::debug;

use crate::analysis::JCallGraph;
use crate::cfg::{CfgEdge, MethodCfg};
use crate::ir::{MethodId, Program, StmtId, StmtKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IcfgNode {
    Entry(MethodId),
    Exit(MethodId),
    Stmt(StmtId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IcfgEdge {
    /// An intra-procedural edge not leaving a call site.
    Normal(CfgEdge),
    /// From a call site to the statement following it in the caller.
    CallToReturn,
    /// From a call site to the entry of a callee.
    Call { callee: MethodId },
    /// From the exit of a callee to the statement following the call site.
    Return { call_site: StmtId, callee: MethodId },
}

/// The inter-procedural control flow graph: the control flow graphs of the
/// reachable methods connected by call and return edges. It is built once
/// against a call graph.
#[derive(Clone, Debug)]
pub struct Icfg {
    graph: LabelledGraph<IcfgEdge>,
    nodes: Vec<IcfgNode>,
    offsets: HashMap<MethodId, usize>,
    cfgs: Vec<MethodCfg>,
}

impl Icfg {
    pub fn new(program: &Program, call_graph: &JCallGraph) -> Self {
        let mut graph = LabelledGraph::default();
        let mut nodes = Vec::new();
        let mut offsets = HashMap::new();
        let mut cfgs = Vec::new();

        for &method in call_graph.reachable_methods() {
            if program.method(method).is_abstract {
                continue;
            }
            let cfg = MethodCfg::new(program, method);
            offsets.insert(method, nodes.len());
            for node in 0..cfg.node_count() {
                graph.new_node();
                nodes.push(match cfg.stmt(node) {
                    Some(stmt) => IcfgNode::Stmt(stmt),
                    None if node == cfg.entry() => IcfgNode::Entry(method),
                    None => IcfgNode::Exit(method),
                });
            }
            cfgs.push(cfg);
        }

        for cfg in &cfgs {
            let offset = offsets[&cfg.method()];
            for node in 0..cfg.node_count() {
                let is_call = cfg
                    .stmt(node)
                    .is_some_and(|s| matches!(program.stmt(s).kind, StmtKind::Invoke(_)));
                for edge in cfg.out_edges(node) {
                    let kind = if is_call {
                        IcfgEdge::CallToReturn
                    } else {
                        IcfgEdge::Normal(edge.kind)
                    };
                    graph.add_edge(offset + edge.source, offset + edge.target, kind);
                }

                let Some(call_site) = cfg.stmt(node).filter(|_| is_call) else {
                    continue;
                };
                for callee in call_graph.callees_of(call_site).unique() {
                    let Some(&callee_offset) = offsets.get(&callee) else {
                        continue;
                    };
                    let callee_exit = callee_offset + program.method(callee).stmts.len() + 1;
                    graph.add_edge(offset + node, callee_offset, IcfgEdge::Call { callee });
                    for return_site in cfg.successors(node) {
                        graph.add_edge(
                            callee_exit,
                            offset + return_site,
                            IcfgEdge::Return { call_site, callee },
                        );
                    }
                }
            }
        }

        for &method in call_graph.entry_methods() {
            if let Some(&offset) = offsets.get(&method) {
                graph
                    .add_entry(offset)
                    .add_exit(offset + program.method(method).stmts.len() + 1);
            }
        }

        debug!(
            "Built ICFG with {} nodes and {} edges over {} methods.",
            nodes.len(),
            graph.edge_count(),
            cfgs.len()
        );
        Self {
            graph,
            nodes,
            offsets,
            cfgs,
        }
    }

    pub fn node(&self, node: usize) -> IcfgNode {
        self.nodes[node]
    }

    pub fn contains_method(&self, method: MethodId) -> bool {
        self.offsets.contains_key(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.cfgs.iter().map(MethodCfg::method)
    }

    pub fn entry_of(&self, method: MethodId) -> Option<usize> {
        self.offsets.get(&method).copied()
    }

    pub fn exit_of(&self, method: MethodId) -> Option<usize> {
        let offset = self.entry_of(method)?;
        self.cfgs
            .iter()
            .find(|cfg| cfg.method() == method)
            .map(|cfg| offset + cfg.exit())
    }

    pub fn node_of(&self, program: &Program, stmt: StmtId) -> Option<usize> {
        let stmt = program.stmt(stmt);
        let offset = self.entry_of(stmt.method)?;
        Some(offset + stmt.index + 1)
    }

    pub fn stmt(&self, node: usize) -> Option<StmtId> {
        match self.nodes[node] {
            IcfgNode::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn method_of(&self, program: &Program, node: usize) -> MethodId {
        match self.nodes[node] {
            IcfgNode::Entry(m) | IcfgNode::Exit(m) => m,
            IcfgNode::Stmt(s) => program.stmt(s).method,
        }
    }
}

impl ControlFlowGraph for Icfg {
    type EdgeKind = IcfgEdge;

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn entries(&self) -> &[usize] {
        self.graph.entries()
    }

    fn exits(&self) -> &[usize] {
        self.graph.exits()
    }

    fn in_edges(&self, node: usize) -> &[Edge<IcfgEdge>] {
        self.graph.in_edges(node)
    }

    fn out_edges(&self, node: usize) -> &[Edge<IcfgEdge>] {
        self.graph.out_edges(node)
    }
}
