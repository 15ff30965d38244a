use test_log::test;

use super::cha::*;
use super::print_call_graph;
use super::test_utils::main_builder;
use crate::ir::*;

struct ChaProgram {
    program: Program,
    main: MethodId,
    a_m: MethodId,
    b_m: MethodId,
    c: ClassId,
    d_m: MethodId,
    unused: MethodId,
}

/// ```text
/// class A { void m() {} }
/// class B extends A { void m() {} }
/// abstract class C extends A { abstract void m(); }
/// class D extends C { void m() {} }
/// interface I { void n(); }
/// class E implements I { void n() {} }
///
/// static void main() {
///   A a = new B(); a.m();
///   I i = new E(); i.n();
///   helper();
/// }
/// ```
fn program() -> ChaProgram {
    let (mut builder, main_class, main) = main_builder();
    let a = builder.class("A", None);
    let b = builder.class("B", Some(a));
    let c = builder.abstract_class("C", Some(a));
    let d = builder.class("D", Some(c));
    let i = builder.interface("I", &[]);
    let e = builder.class("E", None);
    builder.implements(e, i);

    let a_m = builder.method(a, "m", &[], Type::Void);
    let b_m = builder.method(b, "m", &[], Type::Void);
    builder.abstract_method(c, "m", &[], Type::Void);
    let d_m = builder.method(d, "m", &[], Type::Void);
    let i_n = builder.abstract_method(i, "n", &[], Type::Void);
    let e_n = builder.method(e, "n", &[], Type::Void);
    let helper = builder.static_method(main_class, "helper", &[], Type::Void);
    let unused = builder.static_method(main_class, "unused", &[], Type::Void);
    for method in [a_m, b_m, d_m, e_n, helper, unused] {
        let mut body = builder.body(method);
        body.ret(None);
        body.finish().unwrap();
    }

    let mut body = builder.body(main);
    let a_var = body.var("a", Type::Class(a));
    let i_var = body.var("i", Type::Class(i));
    body.new_obj(a_var, b);
    body.call_virtual(None, a_var, a_m, &[]);
    body.new_obj(i_var, e);
    body.call_virtual(None, i_var, i_n, &[]);
    body.call_static(None, helper, &[]);
    body.ret(None);
    body.finish().unwrap();

    ChaProgram {
        program: builder.build().unwrap(),
        main,
        a_m,
        b_m,
        c,
        d_m,
        unused,
    }
}

#[test]
fn virtual_dispatch_skips_abstract_methods() {
    let p = program();
    let call = p.program.method(p.main).stmts[1];
    let invoke = p.program.stmt(call).as_invoke().unwrap();
    assert_eq!(invoke.kind, CallKind::Virtual);
    assert_eq!(resolve(&p.program, invoke), vec![p.a_m, p.b_m, p.d_m]);
}

#[test]
fn special_and_dynamic_calls() {
    let p = program();
    let subsig = p.program.method(p.a_m).subsig.clone();
    let mut invoke = Invoke {
        kind: CallKind::Special,
        method_ref: MethodRef { class: p.c, subsig },
        base: p.program.method(p.main).vars.first().copied(),
        args: vec![],
        result: None,
    };
    assert_eq!(resolve(&p.program, &invoke), vec![p.a_m]);

    invoke.kind = CallKind::Dynamic;
    assert!(resolve(&p.program, &invoke).is_empty());
}

#[test]
fn call_graph_from_entry() {
    let p = program();
    let call_graph = build_call_graph(&p.program).unwrap();
    assert_eq!(call_graph.entry_methods(), &[p.main]);
    assert_eq!(call_graph.reachable_methods().len(), 6);
    assert!(!call_graph.contains(p.unused));

    let expected = "\
<Main: void main()>[1@L2] -> <A: void m()>
<Main: void main()>[1@L2] -> <B: void m()>
<Main: void main()>[1@L2] -> <D: void m()>
<Main: void main()>[3@L4] -> <E: void n()>
<Main: void main()>[4@L5] -> <Main: void helper()>";
    assert_eq!(print_call_graph(&p.program, &call_graph), expected);
}

#[test]
fn missing_entry() {
    let program = Program::default();
    assert!(build_call_graph(&program).is_err());
}
