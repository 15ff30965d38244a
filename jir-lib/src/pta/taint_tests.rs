use test_log::test;

use super::*;
use crate::builder::ProgramBuilder;
use crate::error::{IrError, TaintConfigError};
use crate::ir::*;

const CONFIG: &str = r#"{
  "sources": [
    { "method": "<S: java.lang.String src()>", "type": "java.lang.String" }
  ],
  "sinks": [
    { "method": "<Sink: void snk(java.lang.String,int)>", "index": 0 }
  ],
  "transfers": [
    {
      "method": "<java.lang.String: java.lang.String concat(java.lang.String)>",
      "from": 0,
      "to": "result",
      "type": "java.lang.String"
    }
  ]
}"#;

/// ```text
/// class String { String concat(String p0) { return this; } }
/// class S { static String src() { return new String(); } }
/// class Sink { static void snk(String p0, int p1) {} }
/// static void main() {
///   String t = S.src();
///   String s = "x";
///   String u = s.concat(t);
///   int three = 3;
///   Sink.snk(u, three);
///   [Sink.snk(s, three);]
/// }
/// ```
fn program(clean_sink: bool) -> Program {
    let mut builder = ProgramBuilder::new();
    let main_class = builder.class("Main", None);
    let string = builder.string_class();
    let s_class = builder.class("S", None);
    let sink_class = builder.class("Sink", None);
    let string_type = Type::Class(string);
    let concat = builder.method(string, "concat", &[string_type.clone()], string_type.clone());
    let src = builder.static_method(s_class, "src", &[], string_type.clone());
    let snk = builder.static_method(
        sink_class,
        "snk",
        &[string_type.clone(), Type::Int],
        Type::Void,
    );
    let main = builder.static_method(main_class, "main", &[], Type::Void);
    builder.set_entry(main);

    let mut body = builder.body(concat);
    let this = body.this().unwrap();
    body.ret(Some(this));
    body.finish().unwrap();

    let mut body = builder.body(src);
    let r = body.var("r", string_type.clone());
    body.new_obj(r, string);
    body.ret(Some(r));
    body.finish().unwrap();

    let mut body = builder.body(snk);
    body.ret(None);
    body.finish().unwrap();

    let mut body = builder.body(main);
    let [t, s, u] = ["t", "s", "u"].map(|name| body.var(name, string_type.clone()));
    let three = body.var("three", Type::Int);
    body.call_static(Some(t), src, &[]);
    body.string(s, "x");
    body.call_virtual(Some(u), s, concat, &[t]);
    body.int(three, 3);
    body.call_static(None, snk, &[u, three]);
    if clean_sink {
        body.call_static(None, snk, &[s, three]);
    }
    body.ret(None);
    body.finish().unwrap();
    builder.build().unwrap()
}

fn rules(program: &Program, config: &str) -> Result<TaintRules, TaintConfigError> {
    TaintConfig::from_json(config)?.resolve(program)
}

#[test]
fn taint_through_transfer() {
    let program = program(true);
    let rules = rules(&program, CONFIG).unwrap();
    let result = analyze_with_taint(&program, &ContextInsensitive, &rules).unwrap();

    let main = program.entry_method().unwrap();
    let stmts = &program.method(main).stmts;
    let flows: Vec<TaintFlow> = result.taint_flows().iter().copied().collect();
    assert_eq!(
        flows,
        vec![TaintFlow {
            source: stmts[0],
            sink: stmts[4],
            index: 0
        }]
    );
    assert_eq!(
        print_taint_flows(&program, &result),
        "TaintFlow{<Main: void main()>[0@L1] -> <Main: void main()>[4@L5]/0}"
    );

    let u = program.method(main).vars[2];
    let printed: Vec<String> = result
        .points_to(u)
        .iter()
        .map(|&o| print_obj(&program, result.obj(o)))
        .collect();
    assert_eq!(
        printed,
        vec![
            "TaintObj{<Main: void main()>[0@L1]:java.lang.String}".to_owned(),
            "StringObj{\"x\"}".to_owned()
        ]
    );
}

#[test]
fn taint_with_context_sensitivity() {
    let program = program(false);
    let rules = rules(&program, CONFIG).unwrap();
    for selector in ["1-call", "2-obj", "1-type"] {
        let selector = selector_from_name(selector).unwrap();
        let result = analyze_with_taint(&program, selector.as_ref(), &rules).unwrap();
        assert_eq!(result.taint_flows().len(), 1, "{}", selector.name());
    }
}

#[test]
fn no_flows_without_transfers() {
    let program = program(false);
    let config = r#"{
      "sources": [{ "method": "<S: java.lang.String src()>", "type": "java.lang.String" }],
      "sinks": [{ "method": "<Sink: void snk(java.lang.String,int)>", "index": 0 }]
    }"#;
    let rules = rules(&program, config).unwrap();
    let result = analyze_with_taint(&program, &ContextInsensitive, &rules).unwrap();
    assert!(result.taint_flows().is_empty());

    let plain = analyze(&program, &ContextInsensitive).unwrap();
    assert!(plain.taint_flows().is_empty());
}

#[test]
fn positions() {
    let program = program(false);
    let config = r#"{
      "transfers": [
        {
          "method": "<java.lang.String: java.lang.String concat(java.lang.String)>",
          "from": -1, "to": -2, "type": "java.lang.String"
        },
        {
          "method": "<java.lang.String: java.lang.String concat(java.lang.String)>",
          "from": "base", "to": 0, "type": "java.lang.String"
        }
      ]
    }"#;
    let rules = rules(&program, config).unwrap();
    let concat = program
        .find_method("<java.lang.String: java.lang.String concat(java.lang.String)>")
        .unwrap();
    let transfers = rules.transfers(concat);
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0].from, taint::TaintPosition::Base);
    assert_eq!(transfers[0].to, taint::TaintPosition::Result);
    assert_eq!(transfers[1].to, taint::TaintPosition::Arg(0));
    assert!(rules.sink_indices(concat).is_empty());
    assert!(!rules.is_empty());
}

#[test]
fn invalid_configurations() {
    let program = program(false);
    let err = |config: &str| rules(&program, config).unwrap_err();

    assert!(matches!(err("{"), TaintConfigError::Json(_)));
    assert!(matches!(
        err(r#"{"sinks": [{"method": "<Nope: void f()>", "index": 0}]}"#),
        TaintConfigError::Ir(IrError::UnknownClass(_))
    ));
    assert!(matches!(
        err(r#"{"sinks": [{"method": "<Sink: void other()>", "index": 0}]}"#),
        TaintConfigError::Ir(IrError::UnknownMethod(_))
    ));
    assert!(matches!(
        err(r#"{"sinks": [{"method": "<Sink: void snk(java.lang.String,int)>", "index": 2}]}"#),
        TaintConfigError::IndexOutOfRange { index: 2, .. }
    ));
    assert!(matches!(
        err(r#"{"sources": [{"method": "<Sink: void snk(java.lang.String,int)>", "type": "java.lang.String"}]}"#),
        TaintConfigError::MissingPosition {
            position: "result",
            ..
        }
    ));
    assert!(matches!(
        err(r#"{"transfers": [{"method": "<S: java.lang.String src()>", "from": "base", "to": "result", "type": "java.lang.String"}]}"#),
        TaintConfigError::MissingPosition { position: "base", .. }
    ));
    assert!(matches!(
        err(r#"{"transfers": [{"method": "<S: java.lang.String src()>", "from": "middle", "to": "result", "type": "java.lang.String"}]}"#),
        TaintConfigError::InvalidPosition(p) if p == "middle"
    ));
    assert!(matches!(
        err(r#"{"transfers": [{"method": "<S: java.lang.String src()>", "from": -3, "to": "result", "type": "java.lang.String"}]}"#),
        TaintConfigError::InvalidPosition(p) if p == "-3"
    ));
    assert!(matches!(
        err(r#"{"sources": [{"method": "<S: java.lang.String src()>", "type": "Missing"}]}"#),
        TaintConfigError::Ir(IrError::UnknownType(_))
    ));
}

/// ```text
/// static void main() {
///   String t0 = S.src(); String t1 = t0; String t2 = t1;
///   String s = "x";
///   String u = s.concat(t2);   [String u = t2.concat(s);]
///   int three = 3;
///   Sink.snk(u, three);
/// }
/// ```
///
/// The copies delay the taint of `t2`, so with `s` as the receiver the call
/// to `concat` is resolved before the taint reaches its argument.
fn copy_chain_program(tainted_receiver: bool) -> Program {
    let mut builder = ProgramBuilder::new();
    let main_class = builder.class("Main", None);
    let string = builder.string_class();
    let s_class = builder.class("S", None);
    let sink_class = builder.class("Sink", None);
    let string_type = Type::Class(string);
    let concat = builder.method(string, "concat", &[string_type.clone()], string_type.clone());
    let src = builder.static_method(s_class, "src", &[], string_type.clone());
    let snk = builder.static_method(
        sink_class,
        "snk",
        &[string_type.clone(), Type::Int],
        Type::Void,
    );
    let main = builder.static_method(main_class, "main", &[], Type::Void);
    builder.set_entry(main);

    let mut body = builder.body(concat);
    let this = body.this().unwrap();
    body.ret(Some(this));
    body.finish().unwrap();

    let mut body = builder.body(src);
    let r = body.var("r", string_type.clone());
    body.new_obj(r, string);
    body.ret(Some(r));
    body.finish().unwrap();

    let mut body = builder.body(snk);
    body.ret(None);
    body.finish().unwrap();

    let mut body = builder.body(main);
    let [t0, t1, t2, s, u] =
        ["t0", "t1", "t2", "s", "u"].map(|name| body.var(name, string_type.clone()));
    let three = body.var("three", Type::Int);
    body.call_static(Some(t0), src, &[]);
    body.copy(t1, t0);
    body.copy(t2, t1);
    body.string(s, "x");
    if tainted_receiver {
        body.call_virtual(Some(u), t2, concat, &[s]);
    } else {
        body.call_virtual(Some(u), s, concat, &[t2]);
    }
    body.int(three, 3);
    body.call_static(None, snk, &[u, three]);
    body.ret(None);
    body.finish().unwrap();
    builder.build().unwrap()
}

fn single_flow(program: &Program, config: &str) {
    let rules = rules(program, config).unwrap();
    let result = analyze_with_taint(program, &ContextInsensitive, &rules).unwrap();
    assert_eq!(
        print_taint_flows(program, &result),
        "TaintFlow{<Main: void main()>[0@L1] -> <Main: void main()>[6@L7]/0}"
    );
}

#[test]
fn taint_arriving_after_the_call_is_resolved() {
    single_flow(&copy_chain_program(false), CONFIG);
}

#[test]
fn taint_from_base_to_result() {
    let config = r#"{
      "sources": [{ "method": "<S: java.lang.String src()>", "type": "java.lang.String" }],
      "sinks": [{ "method": "<Sink: void snk(java.lang.String,int)>", "index": 0 }],
      "transfers": [
        {
          "method": "<java.lang.String: java.lang.String concat(java.lang.String)>",
          "from": "base", "to": "result", "type": "java.lang.String"
        }
      ]
    }"#;
    single_flow(&copy_chain_program(true), config);
}
