use std::collections::{BTreeMap, BTreeSet};

use analysis::callgraph::CallEdge;

use crate::{
    analysis::JCallGraph,
    ir::{FieldId, MethodId, VarId},
};

use super::{
    manager::{CSManager, CSObjId, ContextId, Obj, ObjId, Pointer},
    solver::{CSCallGraph, SolverOutput},
    taint::TaintFlow,
};

static NO_OBJS: BTreeSet<ObjId> = BTreeSet::new();

/// The outcome of a pointer analysis. Besides the context-sensitive facts it
/// keeps their context-insensitive projections, merging the contexts of
/// variables and heap objects.
#[derive(Clone, Debug)]
pub struct PointerAnalysisResult {
    selector: String,
    manager: CSManager,
    cs_call_graph: CSCallGraph,
    call_graph: JCallGraph,
    var_points_to: BTreeMap<VarId, BTreeSet<ObjId>>,
    field_points_to: BTreeMap<(ObjId, FieldId), BTreeSet<ObjId>>,
    static_field_points_to: BTreeMap<FieldId, BTreeSet<ObjId>>,
    array_points_to: BTreeMap<ObjId, BTreeSet<ObjId>>,
    taint_flows: BTreeSet<TaintFlow>,
}

impl PointerAnalysisResult {
    pub(super) fn new(selector: String, output: SolverOutput) -> Self {
        let SolverOutput {
            manager,
            call_graph: cs_call_graph,
            taint_flows,
        } = output;

        let mut call_graph = JCallGraph::new();
        for &entry in cs_call_graph.entry_methods() {
            call_graph.add_entry_method(manager.cs_method_data(entry).1);
        }
        for &method in cs_call_graph.reachable_methods() {
            call_graph.add_reachable_method(manager.cs_method_data(method).1);
        }
        for edge in cs_call_graph.edges() {
            call_graph.add_edge(CallEdge {
                kind: edge.kind,
                call_site: manager.cs_call_site_data(edge.call_site).1,
                callee: manager.cs_method_data(edge.callee).1,
            });
        }

        let mut result = Self {
            selector,
            manager,
            cs_call_graph,
            call_graph,
            var_points_to: BTreeMap::new(),
            field_points_to: BTreeMap::new(),
            static_field_points_to: BTreeMap::new(),
            array_points_to: BTreeMap::new(),
            taint_flows,
        };
        result.project();
        result
    }

    fn project(&mut self) {
        let manager = &self.manager;
        let obj_of = |o: CSObjId| manager.cs_obj_data(o).1;
        for (pointer, data) in manager.pointers() {
            let pts = manager.points_to(pointer);
            if pts.is_empty() {
                continue;
            }
            let target = match data {
                Pointer::Var(_, var) => self.var_points_to.entry(var).or_default(),
                Pointer::StaticField(field) => self.static_field_points_to.entry(field).or_default(),
                Pointer::InstanceField(base, field) => {
                    self.field_points_to.entry((obj_of(base), field)).or_default()
                }
                Pointer::ArrayIndex(base) => self.array_points_to.entry(obj_of(base)).or_default(),
            };
            target.extend(pts.iter().map(obj_of));
        }
    }

    /// The name of the context selector used.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn manager(&self) -> &CSManager {
        &self.manager
    }

    pub fn obj(&self, obj: ObjId) -> &Obj {
        self.manager.obj_data(obj)
    }

    /// The objects a variable may point to in any context.
    pub fn points_to(&self, var: VarId) -> &BTreeSet<ObjId> {
        self.var_points_to.get(&var).unwrap_or(&NO_OBJS)
    }

    pub fn field_points_to(&self, base: ObjId, field: FieldId) -> &BTreeSet<ObjId> {
        self.field_points_to.get(&(base, field)).unwrap_or(&NO_OBJS)
    }

    pub fn static_field_points_to(&self, field: FieldId) -> &BTreeSet<ObjId> {
        self.static_field_points_to.get(&field).unwrap_or(&NO_OBJS)
    }

    pub fn array_points_to(&self, array: ObjId) -> &BTreeSet<ObjId> {
        self.array_points_to.get(&array).unwrap_or(&NO_OBJS)
    }

    /// The variables with a non-empty points-to set.
    pub fn vars(&self) -> impl Iterator<Item = (VarId, &BTreeSet<ObjId>)> {
        self.var_points_to.iter().map(|(&var, objs)| (var, objs))
    }

    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        !self.points_to(a).is_disjoint(self.points_to(b))
    }

    /// The objects a variable may point to in the given context.
    pub fn cs_points_to(&self, ctx: ContextId, var: VarId) -> Vec<CSObjId> {
        self.manager
            .find_pointer(&Pointer::Var(ctx, var))
            .map(|p| self.manager.points_to(p).iter().collect())
            .unwrap_or_default()
    }

    /// The contexts a method was analysed in.
    pub fn contexts_of(&self, method: MethodId) -> Vec<ContextId> {
        self.cs_call_graph
            .reachable_methods()
            .iter()
            .map(|&m| self.manager.cs_method_data(m))
            .filter(|&(_, m)| m == method)
            .map(|(ctx, _)| ctx)
            .collect()
    }

    pub fn call_graph(&self) -> &JCallGraph {
        &self.call_graph
    }

    pub fn cs_call_graph(&self) -> &CSCallGraph {
        &self.cs_call_graph
    }

    pub fn taint_flows(&self) -> &BTreeSet<TaintFlow> {
        &self.taint_flows
    }
}
