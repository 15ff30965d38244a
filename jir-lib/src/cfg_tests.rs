use analysis::cfg::ControlFlowGraph;
use test_log::test;

use crate::builder::ProgramBuilder;
use crate::cfg::*;
use crate::ir::*;

fn edges(cfg: &MethodCfg, node: usize) -> Vec<(usize, CfgEdge)> {
    cfg.out_edges(node)
        .iter()
        .map(|e| (e.target, e.kind))
        .collect()
}

#[test]
fn branches_and_returns() {
    let mut builder = ProgramBuilder::new();
    let class = builder.class("Main", None);
    let f = builder.static_method(class, "f", &[Type::Int], Type::Int);
    let mut body = builder.body(f);
    let x = body.param(0);
    let y = body.var("y", Type::Int);
    let other = body.new_label();
    let join = body.new_label();
    body.if_(BinaryOp::Gt, x, x, other);
    body.int(y, 1);
    body.goto(join);
    body.bind(other);
    body.int(y, 2);
    body.bind(join);
    body.ret(Some(y));
    body.finish().unwrap();
    let program = builder.build().unwrap();

    let cfg = MethodCfg::new(&program, f);
    assert_eq!(cfg.node_count(), 7);
    assert_eq!(cfg.entries(), &[0]);
    assert_eq!(cfg.exits(), &[6]);
    assert_eq!(edges(&cfg, 0), vec![(1, CfgEdge::Entry)]);
    assert_eq!(
        edges(&cfg, 1),
        vec![(4, CfgEdge::IfTrue), (2, CfgEdge::IfFalse)]
    );
    assert_eq!(edges(&cfg, 3), vec![(5, CfgEdge::Goto)]);
    assert_eq!(edges(&cfg, 5), vec![(6, CfgEdge::Return)]);
    assert_eq!(cfg.predecessors(5).collect::<Vec<_>>(), vec![3, 4]);
    assert_eq!(cfg.stmt(0), None);
    assert_eq!(cfg.stmt(cfg.exit()), None);
    assert_eq!(cfg.stmt(cfg.node(2)), Some(program.method(f).stmts[2]));
}

#[test]
fn switch_edges() {
    let mut builder = ProgramBuilder::new();
    let class = builder.class("Main", None);
    let f = builder.static_method(class, "f", &[Type::Int], Type::Void);
    let mut body = builder.body(f);
    let x = body.param(0);
    let one = body.new_label();
    let two = body.new_label();
    let out = body.new_label();
    body.switch(x, &[(1, one), (2, two)], out);
    body.bind(one);
    body.nop();
    body.bind(two);
    body.nop();
    body.bind(out);
    body.ret(None);
    body.finish().unwrap();
    let program = builder.build().unwrap();

    let cfg = MethodCfg::new(&program, f);
    assert_eq!(
        edges(&cfg, 1),
        vec![
            (2, CfgEdge::SwitchCase(1)),
            (3, CfgEdge::SwitchCase(2)),
            (4, CfgEdge::SwitchDefault)
        ]
    );
    assert_eq!(edges(&cfg, 2), vec![(3, CfgEdge::FallThrough)]);
}

#[test]
fn empty_body() {
    let mut builder = ProgramBuilder::new();
    let class = builder.class("Main", None);
    let f = builder.static_method(class, "f", &[], Type::Void);
    let program = builder.build().unwrap();

    let cfg = MethodCfg::new(&program, f);
    assert_eq!(cfg.node_count(), 2);
    assert_eq!(edges(&cfg, 0), vec![(1, CfgEdge::Entry)]);
    let expected = r#"digraph "<Main: void f()>" {
  Node_0[label="ENTRY"]
  Node_1[label="EXIT"]

  Node_0 -> Node_1[label="Entry"]
}
"#;
    assert_eq!(print_cfg(&program, &cfg), expected);
}
