use std::collections::{BTreeMap, BTreeSet};

use analysis::{
    cfg::Edge,
    domains::{ConstValue, JoinSemiLattice},
    solvers::{DataflowResult, InterContext, InterTransfer, SolveMonotone},
};
use log::{debug, info};

use crate::{
    error::AnalysisError,
    icfg::{Icfg, IcfgEdge, IcfgNode},
    ir::{CallKind, Exp, FieldId, Invoke, LValue, Program, Stmt, StmtId, StmtKind, VarId},
    pta::{ObjId, PointerAnalysisResult},
};

use super::constprop::{CPFact, ConstantPropagation};

/// The heap accesses that may observe each other according to a pointer
/// analysis. Field aliasing is decided here once, whether array indices
/// alias is decided during the propagation.
#[derive(Clone, Debug, Default)]
pub struct AliasIndex {
    field_store_to_loads: BTreeMap<StmtId, BTreeSet<StmtId>>,
    array_store_to_loads: BTreeMap<StmtId, BTreeSet<StmtId>>,
    array_load_to_stores: BTreeMap<StmtId, BTreeSet<StmtId>>,
}

static NO_STMTS: BTreeSet<StmtId> = BTreeSet::new();

impl AliasIndex {
    pub fn new(program: &Program, icfg: &Icfg, pta: &PointerAnalysisResult) -> Self {
        let mut index = Self::default();

        let mut static_stores: BTreeMap<FieldId, Vec<StmtId>> = BTreeMap::new();
        let mut static_loads: BTreeMap<FieldId, Vec<StmtId>> = BTreeMap::new();
        let mut pointed_by: BTreeMap<ObjId, BTreeSet<VarId>> = BTreeMap::new();
        for method in icfg.methods() {
            let data = program.method(method);
            for &var in &data.vars {
                for &obj in pta.points_to(var) {
                    pointed_by.entry(obj).or_default().insert(var);
                }
            }
            for &stmt in &data.stmts {
                let StmtKind::Assign { lhs, rhs } = &program.stmt(stmt).kind else {
                    continue;
                };
                if let LValue::Field { base: None, field } = lhs {
                    static_stores.entry(*field).or_default().push(stmt);
                }
                if let Exp::Field { base: None, field } = rhs {
                    static_loads.entry(*field).or_default().push(stmt);
                }
            }
        }

        for (field, stores) in &static_stores {
            let loads = static_loads.get(field).map(Vec::as_slice).unwrap_or_default();
            for &store in stores {
                index
                    .field_store_to_loads
                    .entry(store)
                    .or_default()
                    .extend(loads.iter().copied());
            }
        }

        for vars in pointed_by.values() {
            for &v in vars {
                let stores = program.relations(v);
                for &u in vars {
                    let loads = program.relations(u);
                    for &store in &stores.store_fields {
                        for &load in &loads.load_fields {
                            if stored_field(program, store) == loaded_field(program, load) {
                                index.field_store_to_loads.entry(store).or_default().insert(load);
                            }
                        }
                    }
                    for &store in &stores.store_arrays {
                        for &load in &loads.load_arrays {
                            index.array_store_to_loads.entry(store).or_default().insert(load);
                            index.array_load_to_stores.entry(load).or_default().insert(store);
                        }
                    }
                }
            }
        }
        debug!(
            "Alias index relates {} field stores and {} array stores to loads.",
            index.field_store_to_loads.len(),
            index.array_store_to_loads.len()
        );
        index
    }

    pub fn field_loads(&self, store: StmtId) -> &BTreeSet<StmtId> {
        self.field_store_to_loads.get(&store).unwrap_or(&NO_STMTS)
    }

    pub fn array_loads(&self, store: StmtId) -> &BTreeSet<StmtId> {
        self.array_store_to_loads.get(&store).unwrap_or(&NO_STMTS)
    }

    pub fn array_stores(&self, load: StmtId) -> &BTreeSet<StmtId> {
        self.array_load_to_stores.get(&load).unwrap_or(&NO_STMTS)
    }
}

fn stored_field(program: &Program, stmt: StmtId) -> Option<FieldId> {
    match &program.stmt(stmt).kind {
        StmtKind::Assign {
            lhs: LValue::Field { field, .. },
            ..
        } => Some(*field),
        _ => None,
    }
}

fn loaded_field(program: &Program, stmt: StmtId) -> Option<FieldId> {
    match &program.stmt(stmt).kind {
        StmtKind::Assign {
            rhs: Exp::Field { field, .. },
            ..
        } => Some(*field),
        _ => None,
    }
}

/// Constant propagation over the ICFG. Values flow into callees through the
/// arguments and back through the returned variables. With an alias index
/// the values stored into fields and arrays reach the loads that may read
/// them, otherwise loads are not constant.
pub struct InterConstantPropagation<'a> {
    program: &'a Program,
    icfg: &'a Icfg,
    cp: ConstantPropagation<'a>,
    aliases: Option<AliasIndex>,
}

impl<'a> InterConstantPropagation<'a> {
    pub fn new(program: &'a Program, icfg: &'a Icfg, aliases: Option<AliasIndex>) -> Self {
        Self {
            program,
            icfg,
            cp: ConstantPropagation::new(program),
            aliases,
        }
    }

    fn invoke_at(&self, node: usize) -> Option<&'a Invoke> {
        let program = self.program;
        program.stmt(self.icfg.stmt(node)?).as_invoke()
    }

    fn node_of(&self, stmt: StmtId) -> Option<usize> {
        self.icfg.node_of(self.program, stmt)
    }

    /// Copy the input to the output except the loaded variable, its value
    /// comes from the stores.
    fn transfer_load(&self, lhs: VarId, in_fact: &CPFact, out_fact: &mut CPFact) -> bool {
        let mut new_out = in_fact.clone();
        if self.cp.can_hold_int(lhs) {
            new_out.update(lhs, out_fact.get(&lhs, &()), &());
        }
        out_fact.copy_from(&new_out)
    }

    /// Join the value stored by `store` into the variable loaded by `load`
    /// when the indices may be equal. Undefined indices never alias,
    /// unknown ones might.
    fn transfer_array_pair(
        &self,
        store: &Stmt,
        store_out: &CPFact,
        load: &Stmt,
        load_out: &mut CPFact,
    ) -> bool {
        let StmtKind::Assign {
            lhs: LValue::Array { index: i, .. },
            rhs: Exp::Var(x),
        } = &store.kind
        else {
            return false;
        };
        let StmtKind::Assign {
            lhs: LValue::Var(y),
            rhs: Exp::Array { index: j, .. },
        } = &load.kind
        else {
            return false;
        };
        if !self.cp.can_hold_int(*x) || !self.cp.can_hold_int(*y) {
            return false;
        }
        let aliased = match (store_out.get(i, &()), load_out.get(j, &())) {
            (ConstValue::Undef, _) | (_, ConstValue::Undef) => false,
            (ConstValue::Nac, _) | (_, ConstValue::Nac) => true,
            (ConstValue::Const(a), ConstValue::Const(b)) => a == b,
        };
        if !aliased {
            return false;
        }
        let value = load_out.get(y, &()).join(&store_out.get(x, &()), &());
        load_out.update(*y, value, &())
    }

    fn transfer_heap(
        &self,
        aliases: &AliasIndex,
        stmt_id: StmtId,
        in_fact: &CPFact,
        out_fact: &mut CPFact,
        solver: &mut InterContext<'_, Icfg, CPFact>,
    ) -> bool {
        let program = self.program;
        let stmt = program.stmt(stmt_id);
        match &stmt.kind {
            StmtKind::Assign {
                lhs: LValue::Field { .. },
                rhs,
            } => {
                let changed = out_fact.copy_from(&self.cp.transfer_stmt(stmt, in_fact));
                let Exp::Var(x) = rhs else {
                    return changed;
                };
                if !self.cp.can_hold_int(*x) {
                    return changed;
                }
                let value = in_fact.get(x, &());
                for &load in aliases.field_loads(stmt_id) {
                    let Some(load_node) = self.node_of(load) else {
                        continue;
                    };
                    let Some(y) = program.stmt(load).def().filter(|&y| self.cp.can_hold_int(y))
                    else {
                        continue;
                    };
                    let load_out = solver.out_fact_mut(load_node);
                    let new_value = load_out.get(&y, &()).join(&value, &());
                    if load_out.update(y, new_value, &()) {
                        solver.propagate(load_node);
                    }
                }
                changed
            }
            StmtKind::Assign {
                lhs: LValue::Var(y),
                rhs: Exp::Field { .. },
            } => self.transfer_load(*y, in_fact, out_fact),
            StmtKind::Assign {
                lhs: LValue::Array { .. },
                ..
            } => {
                let changed = out_fact.copy_from(&self.cp.transfer_stmt(stmt, in_fact));
                for &load in aliases.array_loads(stmt_id) {
                    let Some(load_node) = self.node_of(load) else {
                        continue;
                    };
                    let load_out = solver.out_fact_mut(load_node);
                    if self.transfer_array_pair(stmt, out_fact, program.stmt(load), load_out) {
                        solver.propagate(load_node);
                    }
                }
                changed
            }
            StmtKind::Assign {
                lhs: LValue::Var(y),
                rhs: Exp::Array { .. },
            } => {
                let mut changed = self.transfer_load(*y, in_fact, out_fact);
                for &store in aliases.array_stores(stmt_id) {
                    let Some(store_node) = self.node_of(store) else {
                        continue;
                    };
                    let store_out = solver.out_fact(store_node);
                    changed |= self.transfer_array_pair(program.stmt(store), store_out, stmt, out_fact);
                }
                changed
            }
            _ => out_fact.copy_from(&self.cp.transfer_stmt(stmt, in_fact)),
        }
    }
}

impl InterTransfer<Icfg, CPFact> for InterConstantPropagation<'_> {
    fn boundary_fact(&mut self, entry: usize, graph: &Icfg) -> CPFact {
        match graph.node(entry) {
            IcfgNode::Entry(method) => self.cp.boundary_fact(method),
            _ => CPFact::new(),
        }
    }

    fn edge(
        &mut self,
        edge: &Edge<IcfgEdge>,
        _graph: &Icfg,
        _ctx: &(),
        source_out: &CPFact,
    ) -> Option<CPFact> {
        match edge.kind {
            IcfgEdge::Normal(_) => Some(source_out.clone()),
            IcfgEdge::CallToReturn => {
                let mut fact = source_out.clone();
                if let Some(result) = self.invoke_at(edge.source).and_then(Invoke::result_var) {
                    fact.remove(&result);
                }
                Some(fact)
            }
            IcfgEdge::Call { callee } => {
                let invoke = self.invoke_at(edge.source)?;
                let callee = self.program.method(callee);
                if invoke.kind == CallKind::Dynamic || invoke.method_ref.subsig != callee.subsig {
                    return None;
                }
                let mut fact = CPFact::new();
                for (arg, &param) in invoke.args.iter().zip(&callee.params) {
                    if self.cp.can_hold_int(param) {
                        fact.update(param, source_out.get(arg, &()), &());
                    }
                }
                Some(fact)
            }
            IcfgEdge::Return { call_site, callee } => {
                let mut fact = CPFact::new();
                let result = self
                    .program
                    .stmt(call_site)
                    .as_invoke()
                    .and_then(Invoke::result_var)
                    .filter(|&r| self.cp.can_hold_int(r));
                if let Some(result) = result {
                    let value = self
                        .program
                        .ret_vars(callee)
                        .iter()
                        .fold(ConstValue::Undef, |acc, ret| acc.join(&source_out.get(ret, &()), &()));
                    fact.update(result, value, &());
                }
                Some(fact)
            }
        }
    }

    fn node(
        &mut self,
        node: usize,
        _ctx: &(),
        in_fact: &CPFact,
        out_fact: &mut CPFact,
        solver: &mut InterContext<'_, Icfg, CPFact>,
    ) -> bool {
        let Some(stmt_id) = self.icfg.stmt(node) else {
            return out_fact.copy_from(in_fact);
        };
        let stmt = self.program.stmt(stmt_id);
        if matches!(stmt.kind, StmtKind::Invoke(_)) {
            return out_fact.copy_from(in_fact);
        }
        match &self.aliases {
            Some(aliases) => self.transfer_heap(aliases, stmt_id, in_fact, out_fact, solver),
            None => out_fact.copy_from(&self.cp.transfer_stmt(stmt, in_fact)),
        }
    }
}

/// Run the inter-procedural constant propagation. Heap accesses are
/// tracked when a pointer analysis result is given.
pub fn analyze(
    program: &Program,
    icfg: &Icfg,
    pta: Option<&PointerAnalysisResult>,
    solver: &SolveMonotone,
) -> Result<DataflowResult<CPFact>, AnalysisError> {
    let aliases = pta.map(|pta| AliasIndex::new(program, icfg, pta));
    let mut transfer = InterConstantPropagation::new(program, icfg, aliases);
    let result = solver
        .solve_inter(icfg, &(), &mut transfer)
        .ok_or(AnalysisError::NoFixpoint {
            analysis: "inter-procedural constant propagation",
        })?;
    info!(
        "Inter-procedural constant propagation finished over {} methods.",
        icfg.methods().count()
    );
    Ok(result)
}
