use std::collections::{HashSet, VecDeque};

use log::{debug, info, warn};

use crate::{
    error::AnalysisError,
    ir::{CallKind, ClassId, Invoke, MethodId, Program, print_method_ref, print_method_signature},
};

use super::{JCallEdge, JCallGraph};

/// Resolve the possible targets of a call using the class hierarchy only.
/// Virtual and interface calls consider every subtype of the declared
/// class. Dynamic calls are not resolved.
pub fn resolve(program: &Program, invoke: &Invoke) -> Vec<MethodId> {
    let method_ref = &invoke.method_ref;
    match invoke.kind {
        CallKind::Static => program
            .declared_method(method_ref.class, &method_ref.subsig)
            .or_else(|| program.resolve_method_ref(method_ref))
            .into_iter()
            .collect(),
        CallKind::Special => program
            .dispatch(method_ref.class, &method_ref.subsig)
            .into_iter()
            .collect(),
        CallKind::Virtual | CallKind::Interface => {
            let mut result = Vec::new();
            let mut visited: HashSet<ClassId> = HashSet::new();
            let mut queue = VecDeque::from([method_ref.class]);
            while let Some(class) = queue.pop_front() {
                if !visited.insert(class) {
                    continue;
                }
                if let Some(target) = program.dispatch(class, &method_ref.subsig) {
                    if !result.contains(&target) {
                        result.push(target);
                    }
                }
                if program.class(class).is_interface {
                    queue.extend(program.direct_subinterfaces(class));
                    queue.extend(program.direct_implementors(class));
                } else {
                    queue.extend(program.direct_subclasses(class));
                }
            }
            result
        }
        CallKind::Dynamic => Vec::new(),
    }
}

/// Build the call graph reachable from the entry method with CHA.
pub fn build_call_graph(program: &Program) -> Result<JCallGraph, AnalysisError> {
    let entry = program.entry_method()?;
    let mut call_graph = JCallGraph::new();
    call_graph.add_entry_method(entry);

    let mut processed = HashSet::new();
    let mut worklist = VecDeque::from([entry]);
    while let Some(method) = worklist.pop_front() {
        if !processed.insert(method) {
            continue;
        }
        call_graph.add_reachable_method(method);
        debug!("New reachable method {}.", print_method_signature(program, method));
        for &call_site in program.call_sites(method) {
            let Some(invoke) = program.stmt(call_site).as_invoke() else {
                continue;
            };
            let callees = resolve(program, invoke);
            if callees.is_empty() && invoke.kind != CallKind::Dynamic {
                warn!(
                    "No target found for call to {}.",
                    print_method_ref(program, &invoke.method_ref)
                );
            }
            for callee in callees {
                call_graph.add_edge(JCallEdge {
                    kind: invoke.kind,
                    call_site,
                    callee,
                });
                if !processed.contains(&callee) {
                    worklist.push_back(callee);
                }
            }
        }
    }

    info!(
        "CHA call graph has {} reachable methods and {} edges.",
        call_graph.reachable_methods().len(),
        call_graph.edge_count()
    );
    Ok(call_graph)
}
