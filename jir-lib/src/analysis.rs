use core::fmt::Display;

use analysis::callgraph::{CallEdge, CallGraph};
use itertools::Itertools;

use crate::ir::{
    CallKind, MethodId, Program, Stmt, StmtId, print_method_signature, print_stmt,
    print_stmt_location,
};

pub mod cha;
pub mod constprop;
pub mod deadcode;
pub mod inter_constprop;
pub mod livevars;

/// Call graphs over program statements and methods, built by CHA or
/// projected from the pointer analysis.
pub type JCallGraph = CallGraph<StmtId, MethodId, CallKind>;
pub type JCallEdge = CallEdge<StmtId, MethodId, CallKind>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Analyses {
    ConstProp,
    LiveVars,
    DeadCode,
    Cha,
    Pta,
    CsPta,
    InterConstProp,
    Taint,
}

impl Display for Analyses {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Analyses::ConstProp => "constprop",
            Analyses::LiveVars => "livevar",
            Analyses::DeadCode => "deadcode",
            Analyses::Cha => "cha",
            Analyses::Pta => "pta",
            Analyses::CsPta => "cspta",
            Analyses::InterConstProp => "inter-constprop",
            Analyses::Taint => "taint",
        };
        write!(f, "{name}")
    }
}

/// Print the body of a method, annotating every statement for which
/// `annotate` returns something.
pub fn print_annotated<F>(program: &Program, method: MethodId, mut annotate: F) -> String
where
    F: FnMut(&Stmt) -> Option<String>,
{
    let mut result = format!("{} {{\n", print_method_signature(program, method));
    for stmt in program.method_stmts(method) {
        result.push_str(&format!("  {}: {}", stmt.index, print_stmt(program, stmt)));
        if let Some(ann) = annotate(stmt) {
            result.push_str(&format!(" /* {ann} */"));
        }
        result.push('\n');
    }
    result.push('}');
    result
}

/// Print the edges of a call graph, one `call site -> callee` per line in a
/// stable order.
pub fn print_call_graph(program: &Program, call_graph: &JCallGraph) -> String {
    call_graph
        .edges()
        .sorted_by_key(|e| (e.call_site, e.callee))
        .map(|e| {
            format!(
                "{} -> {}",
                print_stmt_location(program, e.call_site),
                print_method_signature(program, e.callee)
            )
        })
        .join("\n")
}

#[cfg(test)]
mod cha_tests;



#[cfg(test)]
mod inter_constprop_tests;
