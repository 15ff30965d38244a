use test_log::test;

use crate::cfg::{ControlFlowGraph, Edge, LabelledGraph};
use crate::cfg_tests::{TestCfg, TestEdge, diamond};
use crate::domains::*;
use crate::solvers::*;

type Fact = MapDomain<usize, ConstValue>;

/// Every node defines the variable with its own index as value.
fn define_own_index(node: usize, _cfg: &TestCfg, _ctx: &(), pre: &Fact) -> Fact {
    let mut post = pre.clone();
    post.update(node, ConstValue::Const(node as i32), &());
    post
}

#[test]
fn test_forward_solver() {
    let cfg = diamond();
    let solver = SolveMonotone::default();
    let mut transfer = NodeTransfer::new(define_own_index);
    let result = solver.solve(&cfg, Fact::new(), &(), &mut transfer).unwrap();

    assert_eq!(result.len(), 5);
    // The entry is a boundary node, it is not recomputed.
    assert!(result.out_fact(0).is_empty());
    assert_eq!(result.in_fact(3).get(&2, &()), ConstValue::Const(2));
    assert_eq!(result.in_fact(3).get(&1, &()), ConstValue::Undef);

    let at_exit = result.out_fact(4);
    assert_eq!(at_exit.get(&1, &()), ConstValue::Const(1));
    assert_eq!(at_exit.get(&2, &()), ConstValue::Const(2));
    assert_eq!(at_exit.get(&3, &()), ConstValue::Const(3));
    assert_eq!(at_exit.get(&4, &()), ConstValue::Const(4));
}

struct PruneFalse;

impl TransferFunction<TestCfg, bool> for PruneFalse {
    fn edge(&mut self, edge: &Edge<TestEdge>, _cfg: &TestCfg, _ctx: &(), pre_state: &bool) -> Option<bool> {
        match edge.kind {
            TestEdge::False => None,
            _ => Some(*pre_state),
        }
    }

    fn node(&mut self, _node: usize, _cfg: &TestCfg, _ctx: &(), pre_state: &bool) -> bool {
        *pre_state
    }
}

#[test]
fn test_edge_transfer_prunes() {
    let cfg = diamond();
    let result = SolveMonotone::default()
        .solve(&cfg, true, &(), &mut PruneFalse)
        .unwrap();
    let reached: Vec<bool> = (0..5).map(|n| *result.out_fact(n)).collect();
    assert_eq!(reached, vec![true, true, false, false, true]);
}

#[test]
fn test_backward_solver() {
    // Liveness like analysis: node n kills {n} and generates {n + 1}.
    let cfg = diamond();
    let ctx = BitSetTop(6);
    let mut transfer = NodeTransfer::backward(|node: usize, _cfg: &TestCfg, ctx: &BitSetTop, post: &BitSet| {
        let mut pre = post.clone();
        pre.set(node, false);
        pre.join_into(&BitSet::from(ctx, &[node + 1]), ctx);
        pre
    });
    let result = SolveMonotone::default()
        .solve(&cfg, BitSet::bottom(&ctx), &ctx, &mut transfer)
        .unwrap();

    // The exit is the boundary of backward analyses.
    assert_eq!(*result.in_fact(4), BitSet::bottom(&ctx));
    assert_eq!(*result.out_fact(3), BitSet::bottom(&ctx));
    assert_eq!(*result.in_fact(3), BitSet::from(&ctx, &[4]));
    assert_eq!(*result.in_fact(2), BitSet::from(&ctx, &[3, 4]));
    assert_eq!(*result.out_fact(0), BitSet::from(&ctx, &[2, 3, 4]));
    assert_eq!(*result.in_fact(0), BitSet::from(&ctx, &[1, 2, 3, 4]));
}

#[test]
fn test_node_limit() {
    //     0
    //     |
    //     1 <-+
    //     |   |
    //     2 --+
    let mut cfg = TestCfg::new(3);
    cfg.add_edge(0, 1, TestEdge::Seq)
        .add_edge(1, 2, TestEdge::Seq)
        .add_edge(2, 1, TestEdge::Seq)
        .add_entry(0);
    // A non-monotone transfer function never stabilizes.
    let mut transfer = NodeTransfer::new(|node: usize, _cfg: &TestCfg, _ctx: &(), pre: &bool| {
        if node == 1 { !*pre } else { *pre }
    });
    let solver = SolveMonotone { node_limit: 5 };
    assert!(solver.solve(&cfg, false, &(), &mut transfer).is_none());
}

#[test]
fn test_no_op_transfer() {
    let cfg = diamond();
    let result = SolveMonotone::default()
        .solve(&cfg, true, &(), &mut NoOpTransfer)
        .unwrap();
    assert!((0..5).all(|n| *result.in_fact(n)));
}

/// Node 1 writes a fact directly into the output of node 3, which is in a
/// different component of the graph.
struct RemoteWrite;

impl InterTransfer<TestCfg, BitSet> for RemoteWrite {
    fn boundary_fact(&mut self, _entry: usize, _graph: &TestCfg) -> BitSet {
        BitSet::from(&BitSetTop(10), &[0])
    }

    fn edge(
        &mut self,
        _edge: &Edge<TestEdge>,
        _graph: &TestCfg,
        _ctx: &BitSetTop,
        source_out: &BitSet,
    ) -> Option<BitSet> {
        Some(source_out.clone())
    }

    fn node(
        &mut self,
        node: usize,
        ctx: &BitSetTop,
        in_fact: &BitSet,
        out_fact: &mut BitSet,
        solver: &mut InterContext<'_, TestCfg, BitSet>,
    ) -> bool {
        assert_eq!(solver.current(), node);
        let mut changed = out_fact.join_into(in_fact, ctx);
        if node == 1 {
            changed |= out_fact.join_into(&BitSet::from(ctx, &[1]), ctx);
            if solver.out_fact_mut(3).join_into(&BitSet::from(ctx, &[9]), ctx) {
                solver.propagate(3);
            }
        }
        changed
    }
}

#[test]
fn test_inter_solver_remote_write() {
    // 0 -> 1 -> 2    3 -> 4
    let mut graph: LabelledGraph<TestEdge> = LabelledGraph::new(5);
    graph
        .add_edge(0, 1, TestEdge::Seq)
        .add_edge(1, 2, TestEdge::Seq)
        .add_edge(3, 4, TestEdge::Seq)
        .add_entry(0);
    assert_eq!(graph.entries(), &[0]);

    let ctx = BitSetTop(10);
    let result = SolveMonotone::default()
        .solve_inter(&graph, &ctx, &mut RemoteWrite)
        .unwrap();
    assert_eq!(*result.out_fact(2), BitSet::from(&ctx, &[0, 1]));
    assert_eq!(*result.out_fact(3), BitSet::from(&ctx, &[9]));
    assert_eq!(*result.in_fact(4), BitSet::from(&ctx, &[9]));
    assert_eq!(*result.out_fact(4), BitSet::from(&ctx, &[9]));
    assert_eq!(result.in_fact(0), result.out_fact(0));
}
