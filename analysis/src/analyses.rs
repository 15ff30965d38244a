use fixedbitset::FixedBitSet;

use super::cfg::{ControlFlowGraph, Edge};

/// Compute the set of nodes reachable from the entries of the graph when
/// only the edges accepted by `follow` are traversed. The callback can be
/// used to prune infeasible branches.
pub fn reachable_nodes<Cfg, F>(cfg: &Cfg, mut follow: F) -> FixedBitSet
where
    Cfg: ControlFlowGraph,
    F: FnMut(&Edge<Cfg::EdgeKind>) -> bool,
{
    let mut visited = FixedBitSet::with_capacity(cfg.node_count());
    let mut stack: Vec<usize> = cfg.entries().to_vec();
    while let Some(node) = stack.pop() {
        if visited.put(node) {
            continue;
        }
        for edge in cfg.out_edges(node) {
            if !visited.contains(edge.target) && follow(edge) {
                stack.push(edge.target);
            }
        }
    }
    visited
}
