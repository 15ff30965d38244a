use analysis::solvers::SolveMonotone;
use test_log::test;

use super::constprop::print_fact;
use super::inter_constprop::*;
use super::test_utils::main_builder;
use super::cha;
use crate::builder::ProgramBuilder;
use crate::icfg::Icfg;
use crate::ir::*;
use crate::pta::{self, ContextInsensitive};

fn solver() -> SolveMonotone {
    SolveMonotone { node_limit: 100 }
}

/// The fact at the exit of `method`.
fn exit_fact(program: &Program, method: MethodId, with_pta: bool) -> String {
    let result;
    let (icfg, pta) = if with_pta {
        result = pta::analyze(program, &ContextInsensitive).unwrap();
        (Icfg::new(program, result.call_graph()), Some(&result))
    } else {
        let call_graph = cha::build_call_graph(program).unwrap();
        (Icfg::new(program, &call_graph), None)
    };
    let facts = analyze(program, &icfg, pta, &solver()).unwrap();
    print_fact(program, facts.in_fact(icfg.exit_of(method).unwrap()))
}

/// ```text
/// static int addOne(int p0) { one = 1; r = p0 + one; return r; }
/// static void main() { a = 41; b = addOne(a); [c = 5; d = addOne(c);] }
/// ```
fn calls_program(second_call: bool) -> (Program, MethodId, MethodId) {
    let (mut builder, main_class, main) = main_builder();
    let add_one = builder.static_method(main_class, "addOne", &[Type::Int], Type::Int);
    let mut body = builder.body(add_one);
    let p0 = body.param(0);
    let one = body.var("one", Type::Int);
    let r = body.var("r", Type::Int);
    body.int(one, 1);
    body.binary(r, BinaryOp::Add, p0, one);
    body.ret(Some(r));
    body.finish().unwrap();

    let mut body = builder.body(main);
    let a = body.var("a", Type::Int);
    let b = body.var("b", Type::Int);
    body.int(a, 41);
    body.call_static(Some(b), add_one, &[a]);
    if second_call {
        let c = body.var("c", Type::Int);
        let d = body.var("d", Type::Int);
        body.int(c, 5);
        body.call_static(Some(d), add_one, &[c]);
    }
    body.ret(None);
    body.finish().unwrap();
    (builder.build().unwrap(), main, add_one)
}

#[test]
fn values_flow_through_calls() {
    let (program, main, add_one) = calls_program(false);
    assert_eq!(exit_fact(&program, main, false), "{a=41, b=42}");
    assert_eq!(exit_fact(&program, add_one, false), "{p0=41, one=1, r=42}");
}

#[test]
fn call_sites_are_merged() {
    let (program, main, add_one) = calls_program(true);
    assert_eq!(
        exit_fact(&program, main, false),
        "{a=41, b=NAC, c=5, d=NAC}"
    );
    assert_eq!(exit_fact(&program, add_one, false), "{p0=NAC, one=1, r=NAC}");
}

/// ```text
/// Box o = new Box(); Box p = o; Box q = new Box();
/// x = 7; nine = 9;
/// o.f = x; q.f = nine; y = p.f;
/// Main.s = x; z = Main.s;
/// ```
fn heap_program() -> (Program, MethodId) {
    let (mut builder, main_class, main) = main_builder();
    let box_class = builder.class("Box", None);
    let f = builder.field(box_class, "f", Type::Int);
    let s = builder.static_field(main_class, "s", Type::Int);
    let mut body = builder.body(main);
    let o = body.var("o", Type::Class(box_class));
    let p = body.var("p", Type::Class(box_class));
    let q = body.var("q", Type::Class(box_class));
    let x = body.var("x", Type::Int);
    let nine = body.var("nine", Type::Int);
    let y = body.var("y", Type::Int);
    let z = body.var("z", Type::Int);
    body.new_obj(o, box_class);
    body.copy(p, o);
    body.new_obj(q, box_class);
    body.int(x, 7);
    body.int(nine, 9);
    body.store_field(o, f, x);
    body.store_field(q, f, nine);
    body.load_field(y, p, f);
    body.store_static(s, x);
    body.load_static(z, s);
    body.ret(None);
    body.finish().unwrap();
    (builder.build().unwrap(), main)
}

#[test]
fn heap_loads_without_aliases() {
    let (program, main) = heap_program();
    assert_eq!(
        exit_fact(&program, main, false),
        "{x=7, nine=9, y=NAC, z=NAC}"
    );
}

#[test]
fn heap_loads_follow_aliases() {
    let (program, main) = heap_program();
    assert_eq!(exit_fact(&program, main, true), "{x=7, nine=9, y=7, z=7}");
}

#[test]
fn alias_index_relates_stores_and_loads() {
    let (program, main) = heap_program();
    let result = pta::analyze(&program, &ContextInsensitive).unwrap();
    let icfg = Icfg::new(&program, result.call_graph());
    let index = AliasIndex::new(&program, &icfg, &result);
    let stmts = &program.method(main).stmts;
    assert_eq!(index.field_loads(stmts[5]).iter().copied().collect::<Vec<_>>(), vec![stmts[7]]);
    assert!(index.field_loads(stmts[6]).is_empty());
    assert_eq!(index.field_loads(stmts[8]).iter().copied().collect::<Vec<_>>(), vec![stmts[9]]);
}

/// ```text
/// static void run(int p0) {
///   arr = new int[]; i0 = 0; i1 = 1; v = 3; w = 4;
///   arr[i0] = v; arr[i1] = w;
///   r0 = arr[i0]; r1 = arr[p0];
/// }
/// ```
#[test]
fn array_indices_decide_aliasing() {
    let mut builder = ProgramBuilder::new();
    let class = builder.class("Main", None);
    let run = builder.static_method(class, "run", &[Type::Int], Type::Void);
    builder.set_entry(run);
    let mut body = builder.body(run);
    let p0 = body.param(0);
    let arr = body.var("arr", Type::Array(Box::new(Type::Int)));
    let [i0, i1, v, w, r0, r1] =
        ["i0", "i1", "v", "w", "r0", "r1"].map(|name| body.var(name, Type::Int));
    body.new_array(arr, Type::Int);
    body.int(i0, 0);
    body.int(i1, 1);
    body.int(v, 3);
    body.int(w, 4);
    body.store_array(arr, i0, v);
    body.store_array(arr, i1, w);
    body.load_array(r0, arr, i0);
    body.load_array(r1, arr, p0);
    body.ret(None);
    body.finish().unwrap();
    let program = builder.build().unwrap();

    assert_eq!(
        exit_fact(&program, run, true),
        "{p0=NAC, i0=0, i1=1, v=3, w=4, r0=3, r1=NAC}"
    );
    assert_eq!(
        exit_fact(&program, run, false),
        "{p0=NAC, i0=0, i1=1, v=3, w=4, r0=NAC, r1=NAC}"
    );
}

/// ```text
/// static int s;
/// static int seven() { r = 7; return r; }
/// static void main() { x = 1; Main.s = seven(); y = seven(); }
/// ```
#[test]
fn call_results_stored_into_fields() {
    let (mut builder, main_class, main) = main_builder();
    let s = builder.static_field(main_class, "s", Type::Int);
    let seven = builder.static_method(main_class, "seven", &[], Type::Int);
    let seven_ref = builder.method_ref(seven);
    let mut body = builder.body(seven);
    let r = body.var("r", Type::Int);
    body.int(r, 7);
    body.ret(Some(r));
    body.finish().unwrap();

    let mut body = builder.body(main);
    let x = body.var("x", Type::Int);
    let y = body.var("y", Type::Int);
    body.int(x, 1);
    body.invoke(
        CallKind::Static,
        Some(LValue::Field { base: None, field: s }),
        None,
        seven_ref,
        &[],
    );
    body.call_static(Some(y), seven, &[]);
    body.ret(None);
    body.finish().unwrap();
    let program = builder.build().unwrap();

    assert_eq!(exit_fact(&program, main, false), "{x=1, y=7}");
    assert_eq!(exit_fact(&program, seven, false), "{r=7}");
}
