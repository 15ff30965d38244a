use std::collections::{BTreeSet, HashMap, HashSet, VecDeque, hash_map::Entry};

use analysis::callgraph::{CallEdge, CallGraph};
use log::{debug, trace, warn};

use crate::{
    error::AnalysisError,
    ir::{
        CallKind, Exp, Invoke, LValue, MethodId, Program, StmtId, StmtKind, Type, VarId,
        print_method_signature, print_stmt_location,
    },
};

use super::{
    context::{ContextSelector, ReceiverObj},
    manager::{
        CSCallSiteId, CSManager, CSMethodId, CSObjId, ContextId, ObjId, ObjKind, Pointer,
        PointerId, PointsToSet,
    },
    taint::{TaintFlow, TaintRules},
};

pub type CSCallGraph = CallGraph<CSCallSiteId, CSMethodId, CallKind>;

/// Edges between pointers, `a -> b` means `pt(a)` flows into `pt(b)`.
#[derive(Clone, Debug, Default)]
struct PointerFlowGraph {
    successors: HashMap<PointerId, Vec<PointerId>>,
    edges: HashSet<(PointerId, PointerId)>,
}

impl PointerFlowGraph {
    fn add_edge(&mut self, source: PointerId, target: PointerId) -> bool {
        if !self.edges.insert((source, target)) {
            return false;
        }
        self.successors.entry(source).or_default().push(target);
        true
    }

    fn successors(&self, pointer: PointerId) -> &[PointerId] {
        self.successors.get(&pointer).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Pending points-to sets per pointer. Sets queued for a pointer that is
/// already waiting are merged into its entry.
#[derive(Clone, Debug, Default)]
struct WorkList {
    queue: VecDeque<PointerId>,
    pending: HashMap<PointerId, PointsToSet>,
}

impl WorkList {
    fn push(&mut self, pointer: PointerId, pts: &PointsToSet) {
        match self.pending.entry(pointer) {
            Entry::Occupied(entry) => entry.into_mut().union_with(pts),
            Entry::Vacant(entry) => {
                entry.insert(pts.clone());
                self.queue.push_back(pointer);
            }
        }
    }

    fn pop(&mut self) -> Option<(PointerId, PointsToSet)> {
        let pointer = self.queue.pop_front()?;
        let pts = self.pending.remove(&pointer).unwrap_or_default();
        Some((pointer, pts))
    }
}

/// Andersen-style inclusion based pointer analysis building the call graph
/// on the fly. The context selector decides the sensitivity, the
/// context-insensitive analysis is the instance that always picks the
/// empty context.
pub(super) struct Solver<'p> {
    program: &'p Program,
    selector: &'p dyn ContextSelector,
    taint_rules: Option<&'p TaintRules>,
    manager: CSManager,
    pfg: PointerFlowGraph,
    worklist: WorkList,
    call_graph: CSCallGraph,
    /// The calls with taint transfers using a pointer as an argument or base.
    possible_taint_transfers: HashMap<PointerId, Vec<(CSCallSiteId, MethodId)>>,
}

pub(super) struct SolverOutput {
    pub manager: CSManager,
    pub call_graph: CSCallGraph,
    pub taint_flows: BTreeSet<TaintFlow>,
}

impl<'p> Solver<'p> {
    pub fn new(
        program: &'p Program,
        selector: &'p dyn ContextSelector,
        taint_rules: Option<&'p TaintRules>,
    ) -> Self {
        Self {
            program,
            selector,
            taint_rules,
            manager: CSManager::new(),
            pfg: PointerFlowGraph::default(),
            worklist: WorkList::default(),
            call_graph: CSCallGraph::new(),
            possible_taint_transfers: HashMap::new(),
        }
    }

    pub fn solve(mut self) -> Result<SolverOutput, AnalysisError> {
        let entry = self.program.entry_method()?;
        let cs_entry = self.manager.cs_method(ContextId::EMPTY, entry);
        self.add_reachable(cs_entry);
        self.call_graph.add_entry_method(cs_entry);
        self.analyze();

        let taint_flows = self.collect_taint_flows();
        debug!(
            "Pointer analysis ({}) finished with {} pointers, {} objects and {} call edges.",
            self.selector.name(),
            self.manager.pointers().count(),
            self.manager.cs_obj_count(),
            self.call_graph.edge_count()
        );
        Ok(SolverOutput {
            manager: self.manager,
            call_graph: self.call_graph,
            taint_flows,
        })
    }

    fn var_pointer(&mut self, ctx: ContextId, var: VarId) -> PointerId {
        self.manager.var_pointer(ctx, var)
    }

    fn add_reachable(&mut self, method: CSMethodId) {
        if !self.call_graph.add_reachable_method(method) {
            return;
        }
        let (ctx, m) = self.manager.cs_method_data(method);
        debug!("New reachable method {}.", print_method_signature(self.program, m));

        let program = self.program;
        for &stmt_id in &program.method(m).stmts {
            match &program.stmt(stmt_id).kind {
                StmtKind::Assign {
                    lhs: LValue::Var(x),
                    rhs,
                } => match rhs {
                    Exp::New(ty) => {
                        let obj = self.manager.obj(ObjKind::Alloc(stmt_id), ty.clone(), Some(m));
                        self.add_alloc(ctx, *x, obj);
                    }
                    Exp::StringLiteral(literal) => {
                        let Some(class) = program.string_class() else {
                            warn!("String literal without a string class.");
                            continue;
                        };
                        let kind = ObjKind::StringLiteral(literal.clone());
                        let obj = self.manager.obj(kind, Type::Class(class), None);
                        self.add_alloc(ctx, *x, obj);
                    }
                    Exp::Var(y) | Exp::Cast { var: y, .. } => {
                        let source = self.var_pointer(ctx, *y);
                        let target = self.var_pointer(ctx, *x);
                        self.add_pfg_edge(source, target);
                    }
                    Exp::Field { base: None, field } => {
                        let source = self.manager.pointer(Pointer::StaticField(*field));
                        let target = self.var_pointer(ctx, *x);
                        self.add_pfg_edge(source, target);
                    }
                    _ => {}
                },
                StmtKind::Assign {
                    lhs: LValue::Field { base: None, field },
                    rhs: Exp::Var(y),
                } => {
                    let source = self.var_pointer(ctx, *y);
                    let target = self.manager.pointer(Pointer::StaticField(*field));
                    self.add_pfg_edge(source, target);
                }
                StmtKind::Invoke(invoke) if invoke.kind == CallKind::Static => {
                    let Some(callee) = self.resolve_callee(None, invoke) else {
                        warn!(
                            "Failed to resolve static call at {}.",
                            print_stmt_location(program, stmt_id)
                        );
                        continue;
                    };
                    let callee_ctx = self.selector.select_context(
                        self.manager.context_elements(ctx),
                        stmt_id,
                        callee,
                    );
                    let callee_ctx = self.manager.context(callee_ctx);
                    let cs_call_site = self.manager.cs_call_site(ctx, stmt_id);
                    let cs_callee = self.manager.cs_method(callee_ctx, callee);
                    self.process_call_edge(cs_call_site, cs_callee, invoke.kind);
                }
                _ => {}
            }
        }
    }

    fn add_alloc(&mut self, ctx: ContextId, var: VarId, obj: ObjId) {
        let heap_ctx = self
            .selector
            .select_heap_context(self.manager.context_elements(ctx), obj);
        let heap_ctx = self.manager.context(heap_ctx);
        let cs_obj = self.manager.cs_obj(heap_ctx, obj);
        let pointer = self.var_pointer(ctx, var);
        self.worklist.push(pointer, &PointsToSet::singleton(cs_obj));
    }

    fn add_pfg_edge(&mut self, source: PointerId, target: PointerId) {
        if self.pfg.add_edge(source, target) {
            let pts = self.manager.points_to(source);
            if !pts.is_empty() {
                self.worklist.push(target, pts);
            }
        }
    }

    fn analyze(&mut self) {
        let program = self.program;
        while let Some((pointer, pts)) = self.worklist.pop() {
            let delta = self.propagate(pointer, &pts);
            if delta.is_empty() {
                continue;
            }
            let Pointer::Var(ctx, var) = self.manager.pointer_data(pointer) else {
                continue;
            };
            let relations = program.relations(var);
            for obj in delta.iter() {
                for &stmt in &relations.store_fields {
                    if let StmtKind::Assign {
                        lhs: LValue::Field { field, .. },
                        rhs: Exp::Var(y),
                    } = &program.stmt(stmt).kind
                    {
                        let source = self.var_pointer(ctx, *y);
                        let target = self.manager.pointer(Pointer::InstanceField(obj, *field));
                        self.add_pfg_edge(source, target);
                    }
                }
                for &stmt in &relations.load_fields {
                    if let StmtKind::Assign {
                        lhs: LValue::Var(x),
                        rhs: Exp::Field { field, .. },
                    } = &program.stmt(stmt).kind
                    {
                        let source = self.manager.pointer(Pointer::InstanceField(obj, *field));
                        let target = self.var_pointer(ctx, *x);
                        self.add_pfg_edge(source, target);
                    }
                }
                for &stmt in &relations.store_arrays {
                    if let StmtKind::Assign {
                        lhs: LValue::Array { .. },
                        rhs: Exp::Var(y),
                    } = &program.stmt(stmt).kind
                    {
                        let source = self.var_pointer(ctx, *y);
                        let target = self.manager.pointer(Pointer::ArrayIndex(obj));
                        self.add_pfg_edge(source, target);
                    }
                }
                for &stmt in &relations.load_arrays {
                    if let StmtKind::Assign {
                        lhs: LValue::Var(x),
                        rhs: Exp::Array { .. },
                    } = &program.stmt(stmt).kind
                    {
                        let source = self.manager.pointer(Pointer::ArrayIndex(obj));
                        let target = self.var_pointer(ctx, *x);
                        self.add_pfg_edge(source, target);
                    }
                }
                self.process_call(ctx, var, obj);
            }
            self.handle_taint_arrival(pointer, &delta);
        }
    }

    /// Add the new objects of `pts` to the points-to set of `pointer` and
    /// queue them for its successors. Returns the new objects.
    fn propagate(&mut self, pointer: PointerId, pts: &PointsToSet) -> PointsToSet {
        let delta = self.manager.points_to(pointer).missing_from(pts);
        if !delta.is_empty() {
            trace!("{:?} gains {} objects.", self.manager.pointer_data(pointer), delta.len());
            self.manager.points_to_mut(pointer).union_with(&delta);
            for &succ in self.pfg.successors(pointer) {
                self.worklist.push(succ, &delta);
            }
        }
        delta
    }

    /// Resolve the instance calls with `var` as the receiver for the new
    /// receiver object `recv`.
    fn process_call(&mut self, ctx: ContextId, var: VarId, recv: CSObjId) {
        let program = self.program;
        let (heap_ctx, obj) = self.manager.cs_obj_data(recv);
        for &stmt_id in &program.relations(var).invokes {
            let Some(invoke) = program.stmt(stmt_id).as_invoke() else {
                continue;
            };
            let Some(callee) = self.resolve_callee(Some(obj), invoke) else {
                continue;
            };
            let recv_obj = ReceiverObj {
                heap_context: self.manager.context_elements(heap_ctx),
                obj,
                container_type: self
                    .manager
                    .obj_data(obj)
                    .container
                    .map(|m| program.method(m).class),
            };
            let callee_ctx = self.selector.select_receiver_context(
                self.manager.context_elements(ctx),
                stmt_id,
                &recv_obj,
                callee,
            );
            let callee_ctx = self.manager.context(callee_ctx);
            if let Some(this) = program.method(callee).this {
                let this = self.var_pointer(callee_ctx, this);
                self.worklist.push(this, &PointsToSet::singleton(recv));
            }
            let cs_call_site = self.manager.cs_call_site(ctx, stmt_id);
            let cs_callee = self.manager.cs_method(callee_ctx, callee);
            self.process_call_edge(cs_call_site, cs_callee, invoke.kind);
        }
    }

    /// Static and special calls are resolved statically, virtual and
    /// interface calls dispatch on the type of the receiver object.
    fn resolve_callee(&self, recv: Option<ObjId>, invoke: &Invoke) -> Option<MethodId> {
        let method_ref = &invoke.method_ref;
        match invoke.kind {
            CallKind::Static => self.program.resolve_method_ref(method_ref),
            CallKind::Special => self.program.dispatch(method_ref.class, &method_ref.subsig),
            CallKind::Virtual | CallKind::Interface => match self.manager.obj_data(recv?).ty {
                Type::Class(class) => self.program.dispatch(class, &method_ref.subsig),
                _ => None,
            },
            CallKind::Dynamic => None,
        }
    }

    fn process_call_edge(&mut self, call_site: CSCallSiteId, callee: CSMethodId, kind: CallKind) {
        if !self.call_graph.add_edge(CallEdge {
            kind,
            call_site,
            callee,
        }) {
            return;
        }
        let program = self.program;
        let (caller_ctx, stmt_id) = self.manager.cs_call_site_data(call_site);
        let (callee_ctx, method) = self.manager.cs_method_data(callee);
        debug!(
            "New call edge {} -> {}.",
            print_stmt_location(program, stmt_id),
            print_method_signature(program, method)
        );
        self.add_reachable(callee);

        let Some(invoke) = program.stmt(stmt_id).as_invoke() else {
            return;
        };
        for (&arg, &param) in invoke.args.iter().zip(&program.method(method).params) {
            let source = self.var_pointer(caller_ctx, arg);
            let target = self.var_pointer(callee_ctx, param);
            self.add_pfg_edge(source, target);
        }
        if let Some(result) = invoke.result_var() {
            for &ret in program.ret_vars(method) {
                let source = self.var_pointer(callee_ctx, ret);
                let target = self.var_pointer(caller_ctx, result);
                self.add_pfg_edge(source, target);
            }
        }
        self.handle_taint_call(call_site, method);
    }

    ////////////
    // Taint. //
    ////////////

    fn taint_obj(&mut self, source: StmtId, ty: Type) -> CSObjId {
        let obj = self.manager.obj(ObjKind::Taint { source }, ty, None);
        self.manager.cs_obj(ContextId::EMPTY, obj)
    }

    fn handle_taint_call(&mut self, call_site: CSCallSiteId, callee: MethodId) {
        let Some(rules) = self.taint_rules else {
            return;
        };
        let program = self.program;
        let (ctx, stmt_id) = self.manager.cs_call_site_data(call_site);
        let Some(invoke) = program.stmt(stmt_id).as_invoke() else {
            return;
        };

        if let Some(ty) = rules.source_type(callee) {
            if let Some(result) = invoke.result_var() {
                let taint = self.taint_obj(stmt_id, ty.clone());
                let pointer = self.var_pointer(ctx, result);
                self.worklist.push(pointer, &PointsToSet::singleton(taint));
            }
        }

        if rules.transfers(callee).is_empty() {
            return;
        }
        for &var in invoke.base.iter().chain(&invoke.args) {
            let pointer = self.var_pointer(ctx, var);
            let pending = self.possible_taint_transfers.entry(pointer).or_default();
            if !pending.contains(&(call_site, callee)) {
                pending.push((call_site, callee));
            }
        }
        self.apply_taint_transfers(call_site, callee);
    }

    /// Create the taint objects of the transfers of `callee` at the call
    /// site, keeping the source call of the taint flowing in.
    fn apply_taint_transfers(&mut self, call_site: CSCallSiteId, callee: MethodId) {
        let Some(rules) = self.taint_rules else {
            return;
        };
        let program = self.program;
        let (ctx, stmt_id) = self.manager.cs_call_site_data(call_site);
        let Some(invoke) = program.stmt(stmt_id).as_invoke() else {
            return;
        };
        for transfer in rules.transfers(callee) {
            let (Some(from), Some(to)) = (transfer.from.var(invoke), transfer.to.var(invoke)) else {
                continue;
            };
            let from = self.var_pointer(ctx, from);
            let sources: Vec<StmtId> = self
                .manager
                .points_to(from)
                .iter()
                .filter_map(|o| {
                    let (_, obj) = self.manager.cs_obj_data(o);
                    self.manager.obj_data(obj).taint_source()
                })
                .collect();
            if sources.is_empty() {
                continue;
            }
            let mut taints = PointsToSet::new();
            for source in sources {
                taints.add(self.taint_obj(source, transfer.ty.clone()));
            }
            let to = self.var_pointer(ctx, to);
            self.worklist.push(to, &taints);
        }
    }

    fn handle_taint_arrival(&mut self, pointer: PointerId, delta: &PointsToSet) {
        if self.taint_rules.is_none() {
            return;
        }
        let has_taint = delta.iter().any(|o| {
            let (_, obj) = self.manager.cs_obj_data(o);
            self.manager.obj_data(obj).is_taint()
        });
        if !has_taint {
            return;
        }
        let Some(pending) = self.possible_taint_transfers.get(&pointer).cloned() else {
            return;
        };
        for (call_site, callee) in pending {
            self.apply_taint_transfers(call_site, callee);
        }
    }

    fn collect_taint_flows(&self) -> BTreeSet<TaintFlow> {
        let mut flows = BTreeSet::new();
        let Some(rules) = self.taint_rules else {
            return flows;
        };
        for edge in self.call_graph.edges() {
            let (ctx, stmt_id) = self.manager.cs_call_site_data(edge.call_site);
            let (_, callee) = self.manager.cs_method_data(edge.callee);
            let Some(invoke) = self.program.stmt(stmt_id).as_invoke() else {
                continue;
            };
            for &index in rules.sink_indices(callee) {
                let Some(&arg) = invoke.args.get(index) else {
                    continue;
                };
                let Some(pointer) = self.manager.find_pointer(&Pointer::Var(ctx, arg)) else {
                    continue;
                };
                for o in self.manager.points_to(pointer).iter() {
                    let (_, obj) = self.manager.cs_obj_data(o);
                    if let Some(source) = self.manager.obj_data(obj).taint_source() {
                        flows.insert(TaintFlow {
                            source,
                            sink: stmt_id,
                            index,
                        });
                    }
                }
            }
        }
        flows
    }
}
