use analysis::{
    cfg::Direction,
    domains::{BitSet, BitSetTop, JoinSemiLattice},
    solvers::{DataflowResult, SolveMonotone, TransferFunction},
};
use itertools::Itertools;

use crate::{
    cfg::MethodCfg,
    error::AnalysisError,
    ir::{MethodId, Program, VarId},
};

/// The set of live variables, indexed by [`Program::local_index`].
pub type LiveFact = BitSet;

#[derive(Clone, Copy, Debug)]
pub struct LiveVariables<'p> {
    program: &'p Program,
}

impl<'p> LiveVariables<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    pub fn context(&self, method: MethodId) -> BitSetTop {
        BitSetTop(self.program.method(method).vars.len())
    }
}

impl TransferFunction<MethodCfg, LiveFact> for LiveVariables<'_> {
    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn node(&mut self, node: usize, cfg: &MethodCfg, _ctx: &BitSetTop, pre_state: &LiveFact) -> LiveFact {
        let Some(stmt) = cfg.stmt(node) else {
            return pre_state.clone();
        };
        let stmt = self.program.stmt(stmt);
        let mut live = pre_state.clone();
        if let Some(def) = stmt.def() {
            live.set(self.program.local_index(def), false);
        }
        for var in stmt.uses() {
            live.insert(self.program.local_index(var));
        }
        live
    }
}

pub fn analyze(
    program: &Program,
    cfg: &MethodCfg,
    solver: &SolveMonotone,
) -> Result<DataflowResult<LiveFact>, AnalysisError> {
    let mut transfer = LiveVariables::new(program);
    let ctx = transfer.context(cfg.method());
    solver
        .solve(cfg, LiveFact::bottom(&ctx), &ctx, &mut transfer)
        .ok_or(AnalysisError::NoFixpoint {
            analysis: "live variables",
        })
}

/// Map the members of a fact back to the variables of `method`.
pub fn live_vars(program: &Program, method: MethodId, fact: &LiveFact) -> Vec<VarId> {
    let vars = &program.method(method).vars;
    fact.ones().map(|idx| vars[idx]).collect()
}

pub fn print_fact(program: &Program, method: MethodId, fact: &LiveFact) -> String {
    format!(
        "[{}]",
        live_vars(program, method, fact)
            .into_iter()
            .map(|v| &program.var(v).name)
            .join(", ")
    )
}
