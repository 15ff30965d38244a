use analysis::cfg::{ControlFlowGraph, Edge, LabelledGraph};

use crate::ir::{MethodId, Program, StmtId, StmtKind, print_method_signature, print_stmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CfgEdge {
    /// From the synthetic entry to the first statement.
    Entry,
    FallThrough,
    Goto,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
    /// From a return statement to the synthetic exit.
    Return,
}

/// The control flow graph of a single method. Node 0 is a synthetic entry,
/// node `i + 1` is the statement with index `i`, and the last node is a
/// synthetic exit.
#[derive(Clone, Debug)]
pub struct MethodCfg {
    method: MethodId,
    stmts: Vec<StmtId>,
    graph: LabelledGraph<CfgEdge>,
}

impl MethodCfg {
    pub fn new(program: &Program, method: MethodId) -> Self {
        let stmts = program.method(method).stmts.clone();
        let stmt_num = stmts.len();
        let exit = stmt_num + 1;
        let mut graph = LabelledGraph::new(stmt_num + 2);
        graph.add_entry(0).add_exit(exit);

        if stmt_num == 0 {
            graph.add_edge(0, exit, CfgEdge::Entry);
        } else {
            graph.add_edge(0, 1, CfgEdge::Entry);
        }

        let node = |index: usize| index + 1;
        for (index, &stmt) in stmts.iter().enumerate() {
            let next = node(index + 1);
            match &program.stmt(stmt).kind {
                StmtKind::Goto(target) => {
                    graph.add_edge(node(index), node(*target), CfgEdge::Goto);
                }
                StmtKind::If { target, .. } => {
                    graph
                        .add_edge(node(index), node(*target), CfgEdge::IfTrue)
                        .add_edge(node(index), next, CfgEdge::IfFalse);
                }
                StmtKind::Switch { cases, default, .. } => {
                    for &(value, target) in cases {
                        graph.add_edge(node(index), node(target), CfgEdge::SwitchCase(value));
                    }
                    graph.add_edge(node(index), node(*default), CfgEdge::SwitchDefault);
                }
                StmtKind::Return(_) => {
                    graph.add_edge(node(index), exit, CfgEdge::Return);
                }
                _ => {
                    graph.add_edge(node(index), next, CfgEdge::FallThrough);
                }
            }
        }

        Self {
            method,
            stmts,
            graph,
        }
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn entry(&self) -> usize {
        0
    }

    pub fn exit(&self) -> usize {
        self.stmts.len() + 1
    }

    pub fn stmt(&self, node: usize) -> Option<StmtId> {
        if node == 0 {
            None
        } else {
            self.stmts.get(node - 1).copied()
        }
    }

    pub fn node(&self, stmt_index: usize) -> usize {
        stmt_index + 1
    }

    pub fn stmts(&self) -> &[StmtId] {
        &self.stmts
    }
}

impl ControlFlowGraph for MethodCfg {
    type EdgeKind = CfgEdge;

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn entries(&self) -> &[usize] {
        self.graph.entries()
    }

    fn exits(&self) -> &[usize] {
        self.graph.exits()
    }

    fn in_edges(&self, node: usize) -> &[Edge<CfgEdge>] {
        self.graph.in_edges(node)
    }

    fn out_edges(&self, node: usize) -> &[Edge<CfgEdge>] {
        self.graph.out_edges(node)
    }
}

pub fn print_cfg(program: &Program, cfg: &MethodCfg) -> String {
    let name = format!("\"{}\"", print_method_signature(program, cfg.method()));
    analysis::cfg::print(Some(&name), cfg, |node| match cfg.stmt(node) {
        Some(stmt) => {
            let stmt = program.stmt(stmt);
            format!("{}: {}", stmt.index, print_stmt(program, stmt))
        }
        None if node == cfg.entry() => "ENTRY".to_owned(),
        None => "EXIT".to_owned(),
    })
}
