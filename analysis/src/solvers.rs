use core::marker::PhantomData;
use core::mem;

use log::{debug, trace};

use super::cfg::{ControlFlowGraph, Direction, Edge, RPOWorklist};
use super::domains::JoinSemiLattice;

/// Transfer functions of intra-procedural analyses need to implement this
/// trait. For the most common cases creating a [`NodeTransfer`] from a
/// closure should be sufficient.
pub trait TransferFunction<Cfg, D>
where
    Cfg: ControlFlowGraph,
    D: JoinSemiLattice,
{
    fn direction(&self) -> Direction {
        Direction::Forward
    }

    /// Optional function to apply the effects of traversing an edge. The most
    /// common use case is to implement conditional jumps. Returning `None`
    /// means no state flows along the edge.
    fn edge(
        &mut self,
        _edge: &Edge<Cfg::EdgeKind>,
        _cfg: &Cfg,
        _ctx: &D::LatticeContext,
        pre_state: &D,
    ) -> Option<D> {
        Some(pre_state.clone())
    }

    /// Apply the effects of a node to the analysis state. For backward
    /// analyses `pre_state` is the state after the node.
    fn node(&mut self, node: usize, cfg: &Cfg, ctx: &D::LatticeContext, pre_state: &D) -> D;
}

/// A transfer function that never modifies the analysis state. Handy to
/// compute reachability-like properties with the solver.
pub struct NoOpTransfer;

impl<Cfg, D> TransferFunction<Cfg, D> for NoOpTransfer
where
    Cfg: ControlFlowGraph,
    D: JoinSemiLattice,
{
    fn node(&mut self, _node: usize, _cfg: &Cfg, _ctx: &D::LatticeContext, pre_state: &D) -> D {
        pre_state.clone()
    }
}

/// Small utility so users do not need to create a new struct for every
/// transfer function over nodes.
pub struct NodeTransfer<F, Cfg, D>
where
    Cfg: ControlFlowGraph,
    D: JoinSemiLattice,
    F: FnMut(usize, &Cfg, &D::LatticeContext, &D) -> D,
{
    func: F,
    direction: Direction,
    phantom: PhantomData<(Cfg, D)>,
}

impl<F, Cfg, D> TransferFunction<Cfg, D> for NodeTransfer<F, Cfg, D>
where
    Cfg: ControlFlowGraph,
    D: JoinSemiLattice,
    F: FnMut(usize, &Cfg, &D::LatticeContext, &D) -> D,
{
    fn direction(&self) -> Direction {
        self.direction
    }

    fn node(&mut self, node: usize, cfg: &Cfg, ctx: &D::LatticeContext, pre_state: &D) -> D {
        (self.func)(node, cfg, ctx, pre_state)
    }
}

impl<F, Cfg, D> NodeTransfer<F, Cfg, D>
where
    Cfg: ControlFlowGraph,
    D: JoinSemiLattice,
    F: FnMut(usize, &Cfg, &D::LatticeContext, &D) -> D,
{
    /// Create a new forward transfer function from a closure or function.
    pub fn new(func: F) -> Self {
        Self {
            func,
            direction: Direction::Forward,
            phantom: PhantomData,
        }
    }

    /// Create a new backward transfer function from a closure or function.
    pub fn backward(func: F) -> Self {
        Self {
            func,
            direction: Direction::Backward,
            phantom: PhantomData,
        }
    }
}

/// The facts computed by a solver for every node. Facts are stored relative
/// to the direction of the analysis, the accessors translate them back to
/// the program order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataflowResult<D> {
    direction: Direction,
    pre_states: Vec<D>,
    post_states: Vec<D>,
}

impl<D> DataflowResult<D> {
    /// The fact that holds before the node executes.
    pub fn in_fact(&self, node: usize) -> &D {
        match self.direction {
            Direction::Forward => &self.pre_states[node],
            Direction::Backward => &self.post_states[node],
        }
    }

    /// The fact that holds after the node executes.
    pub fn out_fact(&self, node: usize) -> &D {
        match self.direction {
            Direction::Forward => &self.post_states[node],
            Direction::Backward => &self.pre_states[node],
        }
    }

    pub fn len(&self) -> usize {
        self.pre_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pre_states.is_empty()
    }
}

/// A basic solver for monotonic transfer functions. The solver is using a
/// worklist that visits the queued nodes in reverse post-order of the
/// analysis direction, and every node is visited at least once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SolveMonotone {
    /// Set the approximate visit limit per node. If the limit is reached
    /// (the analysis did not converge in the permitted number of steps),
    /// the solver terminates without a result. Zero means no limit.
    pub node_limit: usize,
}

impl SolveMonotone {
    fn limit(&self, node_num: usize) -> usize {
        self.node_limit.saturating_mul(node_num.max(1))
    }

    /// Run the solver on a CFG returning the analysis states before and
    /// after each node. Returns `None` when the analysis did not converge.
    ///
    /// # Arguments
    ///
    /// * `boundary` - The state at the boundary nodes (the entries for forward
    ///   analyses, the exits for backward ones). It often has the initial
    ///   abstract values for the formal parameters of a function. Boundary
    ///   nodes are not recomputed.
    /// * `transfer` - Function to apply the effects of nodes and edges.
    pub fn solve<Cfg, D, F>(
        &self,
        cfg: &Cfg,
        boundary: D,
        lat_ctx: &D::LatticeContext,
        transfer: &mut F,
    ) -> Option<DataflowResult<D>>
    where
        Cfg: ControlFlowGraph,
        D: JoinSemiLattice,
        F: TransferFunction<Cfg, D>,
    {
        let dir = transfer.direction();
        let node_num = cfg.node_count();
        let mut pre_states = vec![D::bottom(lat_ctx); node_num];
        let mut post_states = vec![D::bottom(lat_ctx); node_num];
        let mut is_boundary = vec![false; node_num];
        for &node in cfg.boundaries(dir) {
            is_boundary[node] = true;
            pre_states[node] = boundary.clone();
            post_states[node] = boundary.clone();
        }

        let mut worklist = RPOWorklist::new(cfg, dir);
        for node in 0..node_num {
            if !is_boundary[node] {
                worklist.push(node);
            }
        }

        let limit = self.limit(node_num);
        let mut processed_nodes = 0_usize;
        while let Some(current) = worklist.pop() {
            if limit > 0 && processed_nodes >= limit {
                debug!("Dataflow solver gave up after {processed_nodes} steps.");
                return None;
            }
            processed_nodes += 1;
            trace!("Visiting node {current}.");

            let mut pre_state = D::bottom(lat_ctx);
            for edge in cfg.flow_in_edges(current, dir) {
                let pred = match dir {
                    Direction::Forward => edge.source,
                    Direction::Backward => edge.target,
                };
                if let Some(transferred) = transfer.edge(edge, cfg, lat_ctx, &post_states[pred]) {
                    pre_state.join_into(&transferred, lat_ctx);
                }
            }
            let post_state = transfer.node(current, cfg, lat_ctx, &pre_state);
            pre_states[current] = pre_state;

            if post_states[current] == post_state {
                continue;
            }
            post_states[current] = post_state;
            for succ in cfg.flow_successors(current, dir) {
                if !is_boundary[succ] {
                    worklist.push(succ);
                }
            }
        }

        debug!("Dataflow solver converged after {processed_nodes} steps.");
        Some(DataflowResult {
            direction: dir,
            pre_states,
            post_states,
        })
    }

    /// Run a forward inter-procedural analysis over a supergraph. Unlike
    /// [`SolveMonotone::solve`], the input state of a node accumulates the
    /// transferred states of its incoming edges, and node transfers can
    /// write into the output states of other nodes via [`InterContext`].
    /// Returns `None` when the analysis did not converge.
    pub fn solve_inter<G, D, F>(
        &self,
        graph: &G,
        lat_ctx: &D::LatticeContext,
        transfer: &mut F,
    ) -> Option<DataflowResult<D>>
    where
        G: ControlFlowGraph,
        D: JoinSemiLattice,
        F: InterTransfer<G, D>,
    {
        let node_num = graph.node_count();
        let mut in_facts = vec![D::bottom(lat_ctx); node_num];
        let mut out_facts = vec![D::bottom(lat_ctx); node_num];
        for &entry in graph.entries() {
            let boundary = transfer.boundary_fact(entry, graph);
            in_facts[entry] = boundary.clone();
            out_facts[entry] = boundary;
        }

        let mut worklist = RPOWorklist::new(graph, Direction::Forward);
        for node in 0..node_num {
            worklist.push(node);
        }

        let limit = self.limit(node_num);
        let mut processed_nodes = 0_usize;
        while let Some(current) = worklist.pop() {
            if limit > 0 && processed_nodes >= limit {
                debug!("Inter-procedural solver gave up after {processed_nodes} steps.");
                return None;
            }
            processed_nodes += 1;
            trace!("Visiting supergraph node {current}.");

            let mut in_fact = mem::replace(&mut in_facts[current], D::bottom(lat_ctx));
            for edge in graph.in_edges(current) {
                if let Some(transferred) = transfer.edge(edge, graph, lat_ctx, &out_facts[edge.source])
                {
                    in_fact.join_into(&transferred, lat_ctx);
                }
            }

            let mut out_fact = mem::replace(&mut out_facts[current], D::bottom(lat_ctx));
            let changed = {
                let mut ctx = InterContext {
                    graph,
                    current,
                    out_facts: &mut out_facts,
                    worklist: &mut worklist,
                };
                transfer.node(current, lat_ctx, &in_fact, &mut out_fact, &mut ctx)
            };
            in_facts[current] = in_fact;
            out_facts[current] = out_fact;

            if changed {
                for succ in graph.successors(current) {
                    worklist.push(succ);
                }
            }
        }

        debug!("Inter-procedural solver converged after {processed_nodes} steps.");
        Some(DataflowResult {
            direction: Direction::Forward,
            pre_states: in_facts,
            post_states: out_facts,
        })
    }
}

/// Transfer functions of the inter-procedural solver. Node transfers work
/// in place and report whether the output state changed.
pub trait InterTransfer<G, D>
where
    G: ControlFlowGraph,
    D: JoinSemiLattice,
{
    /// The state at the entry nodes of the supergraph.
    fn boundary_fact(&mut self, entry: usize, graph: &G) -> D;

    /// The state flowing along `edge` given the output state of its source.
    /// Returning `None` means no state flows along the edge.
    fn edge(
        &mut self,
        edge: &Edge<G::EdgeKind>,
        graph: &G,
        ctx: &D::LatticeContext,
        source_out: &D,
    ) -> Option<D>;

    fn node(
        &mut self,
        node: usize,
        ctx: &D::LatticeContext,
        in_fact: &D,
        out_fact: &mut D,
        solver: &mut InterContext<'_, G, D>,
    ) -> bool;
}

/// Gives node transfers access to the output states of other nodes. The
/// state of the node under transfer is passed separately, here it reads as
/// bottom.
pub struct InterContext<'a, G, D> {
    graph: &'a G,
    current: usize,
    out_facts: &'a mut [D],
    worklist: &'a mut RPOWorklist,
}

impl<G: ControlFlowGraph, D> InterContext<'_, G, D> {
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn out_fact(&self, node: usize) -> &D {
        &self.out_facts[node]
    }

    /// Mutable access to the output state of another node. After changing it
    /// call [`InterContext::propagate`] so its successors are revisited.
    pub fn out_fact_mut(&mut self, node: usize) -> &mut D {
        debug_assert_ne!(node, self.current, "The current state is passed to the transfer.");
        &mut self.out_facts[node]
    }

    /// Enqueue the successors of `node` without recomputing `node` itself.
    pub fn propagate(&mut self, node: usize) {
        for succ in self.graph.successors(node) {
            self.worklist.push(succ);
        }
    }
}
