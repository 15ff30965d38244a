use test_log::test;

use crate::builder::ProgramBuilder;
use crate::error::IrError;
use crate::ir::*;

struct Hierarchy {
    program: Program,
    a: ClassId,
    b: ClassId,
    c: ClassId,
    i: ClassId,
    d: ClassId,
}

/// ```text
/// interface I { void m(); }
/// class A { void m() {} }
/// class B extends A { void m() {} }
/// class C extends B {}
/// abstract class D implements I { abstract void m(); }
/// ```
fn hierarchy() -> Hierarchy {
    let mut builder = ProgramBuilder::new();
    let i = builder.interface("I", &[]);
    let a = builder.class("A", None);
    let b = builder.class("B", Some(a));
    let c = builder.class("C", Some(b));
    let d = builder.abstract_class("D", None);
    builder.implements(d, i);
    builder.abstract_method(i, "m", &[], Type::Void);
    builder.abstract_method(d, "m", &[], Type::Void);
    for class in [a, b] {
        let m = builder.method(class, "m", &[], Type::Void);
        let mut body = builder.body(m);
        body.ret(None);
        body.finish().unwrap();
    }
    Hierarchy {
        program: builder.build().unwrap(),
        a,
        b,
        c,
        i,
        d,
    }
}

fn void_m() -> Subsignature {
    Subsignature {
        name: "m".to_owned(),
        params: vec![],
        ret: Type::Void,
    }
}

#[test]
fn dispatch_walks_superclasses() {
    let h = hierarchy();
    let program = &h.program;
    let b_m = program.declared_method(h.b, &void_m()).unwrap();
    assert_eq!(program.dispatch(h.c, &void_m()), Some(b_m));
    assert_eq!(program.dispatch(h.b, &void_m()), Some(b_m));
    assert_ne!(program.dispatch(h.a, &void_m()), Some(b_m));
    assert!(program.declared_method(h.c, &void_m()).is_none());
}

#[test]
fn dispatch_skips_abstract_methods() {
    let h = hierarchy();
    assert_eq!(h.program.dispatch(h.d, &void_m()), None);
    assert_eq!(h.program.dispatch(h.i, &void_m()), None);
}

#[test]
fn resolve_through_interfaces() {
    let h = hierarchy();
    let program = &h.program;
    let method_ref = MethodRef {
        class: h.c,
        subsig: void_m(),
    };
    assert_eq!(
        program.resolve_method_ref(&method_ref),
        program.declared_method(h.b, &void_m())
    );

    let missing = MethodRef {
        class: h.a,
        subsig: Subsignature {
            name: "n".to_owned(),
            ..void_m()
        },
    };
    assert_eq!(program.resolve_method_ref(&missing), None);
}

#[test]
fn subtypes() {
    let h = hierarchy();
    let program = &h.program;
    assert!(program.is_subtype(h.c, h.a));
    assert!(program.is_subtype(h.a, h.a));
    assert!(program.is_subtype(h.d, h.i));
    assert!(!program.is_subtype(h.a, h.c));
    assert!(!program.is_subtype(h.a, h.i));
    assert_eq!(program.direct_subclasses(h.a), &[h.b]);
    assert_eq!(program.direct_implementors(h.i), &[h.d]);
}

#[test]
fn parse_signatures() {
    let h = hierarchy();
    let program = &h.program;
    let b_m = program.find_method("<B: void m()>").unwrap();
    assert_eq!(program.method(b_m).class, h.b);
    assert_eq!(print_method_signature(program, b_m), "<B: void m()>");

    assert_eq!(
        program.parse_type("A[][]").unwrap(),
        Type::Array(Box::new(Type::Array(Box::new(Type::Class(h.a)))))
    );
    assert!(matches!(
        program.parse_type("Missing"),
        Err(IrError::UnknownType(_))
    ));
    assert!(matches!(
        program.find_method("<C: void m()>"),
        Err(IrError::UnknownMethod(_))
    ));
    assert!(matches!(
        program.parse_method_ref("B.m()"),
        Err(IrError::MalformedSignature(_))
    ));
    assert!(matches!(
        program.parse_method_ref("<Nope: void m()>"),
        Err(IrError::UnknownClass(_))
    ));
}
