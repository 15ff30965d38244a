use analysis::{analyses::reachable_nodes, domains::ConstValue, solvers::DataflowResult};
use log::debug;

use crate::{
    cfg::{CfgEdge, MethodCfg},
    ir::{BinaryOp, Exp, LValue, Program, StmtId, StmtKind, print_method_signature},
};

use super::{
    constprop::{CPFact, ConstantPropagation},
    livevars::LiveFact,
};

/// Find the dead statements of a method: the statements that are never
/// reached once the branches with constant conditions are pruned, and
/// the assignments to variables that are not live afterwards. The result
/// is sorted by statement index.
pub fn detect_dead_code(
    program: &Program,
    cfg: &MethodCfg,
    constants: &DataflowResult<CPFact>,
    live_vars: &DataflowResult<LiveFact>,
) -> Vec<StmtId> {
    let cp = ConstantPropagation::new(program);
    let reachable = reachable_nodes(cfg, |edge| {
        let Some(stmt) = cfg.stmt(edge.source) else {
            return true;
        };
        let in_fact = constants.in_fact(edge.source);
        match &program.stmt(stmt).kind {
            StmtKind::If { cond, .. } => match cp.evaluate(&Exp::Binary(*cond), in_fact) {
                ConstValue::Const(c) => match edge.kind {
                    CfgEdge::IfTrue => c != 0,
                    CfgEdge::IfFalse => c == 0,
                    _ => true,
                },
                _ => true,
            },
            StmtKind::Switch { var, cases, .. } => match cp.evaluate(&Exp::Var(*var), in_fact) {
                ConstValue::Const(k) => {
                    let has_case = cases.iter().any(|&(value, _)| value == k);
                    match edge.kind {
                        CfgEdge::SwitchCase(value) => value == k,
                        CfgEdge::SwitchDefault => !has_case,
                        _ => true,
                    }
                }
                _ => true,
            },
            _ => true,
        }
    });

    let mut dead = Vec::new();
    for (index, &stmt_id) in cfg.stmts().iter().enumerate() {
        let node = cfg.node(index);
        let stmt = program.stmt(stmt_id);
        if !reachable.contains(node) {
            if stmt.line >= 0 {
                dead.push(stmt_id);
            }
            continue;
        }
        if let StmtKind::Assign {
            lhs: LValue::Var(lhs),
            rhs,
        } = &stmt.kind
        {
            let live = live_vars.out_fact(node).contains(program.local_index(*lhs));
            if !live && has_no_side_effect(rhs) {
                dead.push(stmt_id);
            }
        }
    }
    dead.sort_by_key(|&s| program.stmt(s).index);
    debug!(
        "Found {} dead statements in {}.",
        dead.len(),
        print_method_signature(program, cfg.method())
    );
    dead
}

/// Allocations, casts, heap accesses and divisions might have observable
/// effects (running initializers or throwing) even when the result is unused.
pub fn has_no_side_effect(rhs: &Exp) -> bool {
    match rhs {
        Exp::New(_) | Exp::Cast { .. } | Exp::Field { .. } | Exp::Array { .. } => false,
        Exp::Binary(b) => !matches!(b.op, BinaryOp::Div | BinaryOp::Rem),
        _ => true,
    }
}
