use analysis::{
    domains::{ConstValue, MapDomain},
    solvers::{DataflowResult, SolveMonotone, TransferFunction},
};
use itertools::Itertools;
use log::info;

use crate::{
    cfg::MethodCfg,
    error::AnalysisError,
    ir::{BinaryOp, Exp, LValue, MethodId, Program, Stmt, StmtKind, VarId, print_method_signature},
};

/// Maps the integer-holding variables to their abstract values. Variables
/// that are absent are `Undef`.
pub type CPFact = MapDomain<VarId, ConstValue>;

#[derive(Clone, Copy, Debug)]
pub struct ConstantPropagation<'p> {
    program: &'p Program,
}

impl<'p> ConstantPropagation<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// The state at the entry of a method: the integer parameters can have
    /// any value.
    pub fn boundary_fact(&self, method: MethodId) -> CPFact {
        let mut fact = CPFact::new();
        for &param in &self.program.method(method).params {
            if self.can_hold_int(param) {
                fact.update(param, ConstValue::Nac, &());
            }
        }
        fact
    }

    pub fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty.can_hold_int()
    }

    fn eval_var(&self, var: VarId, fact: &CPFact) -> ConstValue {
        if self.can_hold_int(var) {
            fact.get(&var, &())
        } else {
            ConstValue::Nac
        }
    }

    pub fn evaluate(&self, exp: &Exp, fact: &CPFact) -> ConstValue {
        match exp {
            Exp::IntLiteral(i) => ConstValue::Const(*i),
            Exp::Var(v) => self.eval_var(*v, fact),
            Exp::Binary(b) => evaluate_binary(
                b.op,
                self.eval_var(b.lhs, fact),
                self.eval_var(b.rhs, fact),
            ),
            _ => ConstValue::Nac,
        }
    }

    /// Compute the state after `stmt`. Only definitions of integer-holding
    /// variables change the state, calls define their result as `Nac`.
    pub fn transfer_stmt(&self, stmt: &Stmt, in_fact: &CPFact) -> CPFact {
        let mut out = in_fact.clone();
        match &stmt.kind {
            StmtKind::Assign {
                lhs: LValue::Var(lhs),
                rhs,
            } if self.can_hold_int(*lhs) => {
                let value = self.evaluate(rhs, in_fact);
                out.update(*lhs, value, &());
            }
            StmtKind::Invoke(invoke) => {
                if let Some(result) = invoke.result_var().filter(|&r| self.can_hold_int(r)) {
                    out.update(result, ConstValue::Nac, &());
                }
            }
            _ => {}
        }
        out
    }
}

/// Evaluate a binary operator with 32-bit two's complement semantics.
pub fn evaluate_binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> ConstValue {
    use BinaryOp::*;
    if matches!(op, Div | Rem) && rhs == ConstValue::Const(0) {
        // Division by zero throws, no value reaches the definition.
        return ConstValue::Undef;
    }
    match (lhs, rhs) {
        (ConstValue::Const(a), ConstValue::Const(b)) => ConstValue::Const(match op {
            Add => a.wrapping_add(b),
            Sub => a.wrapping_sub(b),
            Mul => a.wrapping_mul(b),
            Div => a.wrapping_div(b),
            Rem => a.wrapping_rem(b),
            Or => a | b,
            And => a & b,
            Xor => a ^ b,
            Shl => a.wrapping_shl(b as u32),
            Shr => a.wrapping_shr(b as u32),
            Ushr => (a as u32).wrapping_shr(b as u32) as i32,
            Eq => i32::from(a == b),
            Ne => i32::from(a != b),
            Lt => i32::from(a < b),
            Gt => i32::from(a > b),
            Le => i32::from(a <= b),
            Ge => i32::from(a >= b),
        }),
        (ConstValue::Nac, _) | (_, ConstValue::Nac) => ConstValue::Nac,
        _ => ConstValue::Undef,
    }
}

impl TransferFunction<MethodCfg, CPFact> for ConstantPropagation<'_> {
    fn node(&mut self, node: usize, cfg: &MethodCfg, _ctx: &(), pre_state: &CPFact) -> CPFact {
        match cfg.stmt(node) {
            Some(stmt) => self.transfer_stmt(self.program.stmt(stmt), pre_state),
            None => pre_state.clone(),
        }
    }
}

pub fn analyze(
    program: &Program,
    cfg: &MethodCfg,
    solver: &SolveMonotone,
) -> Result<DataflowResult<CPFact>, AnalysisError> {
    let mut transfer = ConstantPropagation::new(program);
    let boundary = transfer.boundary_fact(cfg.method());
    let result = solver
        .solve(cfg, boundary, &(), &mut transfer)
        .ok_or(AnalysisError::NoFixpoint {
            analysis: "constant propagation",
        })?;
    info!(
        "Constant propagation finished for {}.",
        print_method_signature(program, cfg.method())
    );
    Ok(result)
}

/// Print a fact as `{a=1, b=NAC}` in variable order.
pub fn print_fact(program: &Program, fact: &CPFact) -> String {
    format!(
        "{{{}}}",
        fact.iter()
            .map(|(var, value)| format!("{}={value}", program.var(*var).name))
            .join(", ")
    )
}
