//! Inclusion based pointer analyses with pluggable context sensitivity and
//! an optional taint tracking plug-in.

use itertools::Itertools;
use log::info;

use crate::{
    error::AnalysisError,
    ir::{Program, print_method_signature, print_stmt_location, print_type},
};

pub mod context;
pub mod manager;
pub mod result;
pub mod solver;
pub mod taint;

pub use context::{
    ContextElement, ContextInsensitive, ContextSelector, KCallSite, KObject, KType, ReceiverObj,
};
pub use manager::{ContextId, Obj, ObjId, ObjKind};
pub use result::PointerAnalysisResult;
pub use taint::{TaintConfig, TaintFlow, TaintRules};

use solver::Solver;

/// Run the pointer analysis from the entry method of the program.
pub fn analyze(
    program: &Program,
    selector: &dyn ContextSelector,
) -> Result<PointerAnalysisResult, AnalysisError> {
    run(program, selector, None)
}

/// Run the pointer analysis tracking the taint described by `rules`. The
/// detected flows are available through
/// [`PointerAnalysisResult::taint_flows`].
pub fn analyze_with_taint(
    program: &Program,
    selector: &dyn ContextSelector,
    rules: &TaintRules,
) -> Result<PointerAnalysisResult, AnalysisError> {
    run(program, selector, Some(rules))
}

fn run(
    program: &Program,
    selector: &dyn ContextSelector,
    rules: Option<&TaintRules>,
) -> Result<PointerAnalysisResult, AnalysisError> {
    let output = Solver::new(program, selector, rules).solve()?;
    let result = PointerAnalysisResult::new(selector.name(), output);
    info!(
        "Pointer analysis ({}) reached {} methods.",
        result.selector(),
        result.call_graph().reachable_methods().len()
    );
    if rules.is_some() {
        info!("Detected {} taint flows.", result.taint_flows().len());
    }
    Ok(result)
}

/// Parse the name of a context selector: `ci`, `<k>-call`, `<k>-obj` or
/// `<k>-type`.
pub fn selector_from_name(name: &str) -> Option<Box<dyn ContextSelector>> {
    if name == "ci" {
        return Some(Box::new(ContextInsensitive));
    }
    let (k, kind) = name.split_once('-')?;
    let k: usize = k.parse().ok().filter(|&k| k > 0)?;
    match kind {
        "call" => Some(Box::new(KCallSite { k })),
        "obj" => Some(Box::new(KObject { k })),
        "type" => Some(Box::new(KType { k })),
        _ => None,
    }
}

pub fn print_obj(program: &Program, obj: &Obj) -> String {
    match &obj.kind {
        ObjKind::Alloc(stmt) => format!(
            "NewObj{{{}:{}}}",
            print_stmt_location(program, *stmt),
            print_type(program, &obj.ty)
        ),
        ObjKind::StringLiteral(literal) => format!("StringObj{{{literal:?}}}"),
        ObjKind::Taint { source } => format!(
            "TaintObj{{{}:{}}}",
            print_stmt_location(program, *source),
            print_type(program, &obj.ty)
        ),
    }
}

pub fn print_context(program: &Program, result: &PointerAnalysisResult, ctx: ContextId) -> String {
    let elements = result
        .manager()
        .context_elements(ctx)
        .iter()
        .map(|elem| match elem {
            ContextElement::CallSite(stmt) => print_stmt_location(program, *stmt),
            ContextElement::Obj(obj) => print_obj(program, result.obj(*obj)),
            ContextElement::Type(class) => program.class(*class).name.clone(),
        })
        .join(", ");
    format!("[{elements}]")
}

/// Print the context-insensitive points-to sets of the variables, one
/// `<method>/var -> [objects]` per line.
pub fn print_points_to(program: &Program, result: &PointerAnalysisResult) -> String {
    result
        .vars()
        .map(|(var, objs)| {
            let data = program.var(var);
            format!(
                "{}/{} -> [{}]",
                print_method_signature(program, data.method),
                data.name,
                objs.iter().map(|&o| print_obj(program, result.obj(o))).join(", ")
            )
        })
        .join("\n")
}

pub fn print_taint_flows(program: &Program, result: &PointerAnalysisResult) -> String {
    result
        .taint_flows()
        .iter()
        .map(|flow| {
            format!(
                "TaintFlow{{{} -> {}/{}}}",
                print_stmt_location(program, flow.source),
                print_stmt_location(program, flow.sink),
                flow.index
            )
        })
        .join("\n")
}


#[cfg(test)]
mod context_tests;

#[cfg(test)]
mod taint_tests;
