use core::cmp::Ordering;
use core::fmt::Debug;
use core::ops::{Deref, DerefMut};

use fixedbitset::FixedBitSet;

/// The facts of a dataflow analysis. Elements are ordered by precision:
/// a smaller element is a more precise description of the program states.
/// Bottom is the fact of unreachable code and the unit of the join.
///
/// Some domains need a piece of shared information to build their
/// elements, like the size of the universe of a bit set. It is passed in
/// the [`JoinSemiLattice::LatticeContext`], domains that need none use `()`.
pub trait JoinSemiLattice: Eq + PartialOrd + Clone + Debug {
    type LatticeContext;

    /// The smallest element.
    fn bottom(ctx: &Self::LatticeContext) -> Self;

    /// The least upper bound. It has to be commutative, associative and
    /// idempotent with [`JoinSemiLattice::bottom`] as its unit.
    fn join(&self, other: &Self, ctx: &Self::LatticeContext) -> Self;

    /// Join `other` into `self` in place and report whether `self` grew.
    /// Maps and sets override this to avoid the clone.
    fn join_into(&mut self, other: &Self, ctx: &Self::LatticeContext) -> bool {
        let joined = self.join(other, ctx);
        if joined == *self {
            return false;
        }
        *self = joined;
        true
    }
}

/// A join semi-lattice with a greatest element and greatest lower bounds.
pub trait Lattice: JoinSemiLattice {
    /// The largest, least precise element.
    fn top(ctx: &Self::LatticeContext) -> Self;

    fn meet(&self, other: &Self, ctx: &Self::LatticeContext) -> Self;
}

/// Shorthands for domains without a lattice context.
pub trait JoinSemiLatticeNoContext: JoinSemiLattice {
    fn bottom_() -> Self;
    fn join_(&self, other: &Self) -> Self;
}

impl<L: JoinSemiLattice<LatticeContext = ()>> JoinSemiLatticeNoContext for L {
    fn bottom_() -> Self {
        L::bottom(&())
    }

    fn join_(&self, other: &Self) -> Self {
        self.join(other, &())
    }
}

pub trait LatticeNoContext: Lattice {
    fn top_() -> Self;
    fn meet_(&self, other: &Self) -> Self;
}

impl<L: Lattice<LatticeContext = ()>> LatticeNoContext for L {
    fn top_() -> Self {
        L::top(&())
    }

    fn meet_(&self, other: &Self) -> Self {
        self.meet(other, &())
    }
}

/// Reachability: `false` is bottom, join is or.
impl JoinSemiLattice for bool {
    type LatticeContext = ();

    fn bottom(&(): &Self::LatticeContext) -> Self {
        false
    }

    fn join(&self, other: &Self, &(): &Self::LatticeContext) -> Self {
        *self || *other
    }
}

/// A power set lattice over the natural numbers below a fixed bound,
/// union is join, intersection is meet. Live variables and similar
/// may-analyses map their elements to dense indices and use this domain.
#[derive(PartialEq, Eq, Clone)]
pub struct BitSet(pub FixedBitSet);

impl Deref for BitSet {
    type Target = FixedBitSet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for BitSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// The size of the universe of a [`BitSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSetTop(pub usize);

impl BitSet {
    pub fn from(ctx: &BitSetTop, values: &[usize]) -> Self {
        let mut inner = FixedBitSet::with_capacity(ctx.0);
        for &v in values {
            inner.insert(v);
        }
        Self(inner)
    }
}

impl PartialOrd for BitSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_superset(other), other.is_superset(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (_, _) => None,
        }
    }
}

impl Debug for BitSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let elements: Vec<String> = self.ones().map(|x| x.to_string()).collect();
        write!(f, "{{{}}}", elements.join(", "))
    }
}

impl JoinSemiLattice for BitSet {
    type LatticeContext = BitSetTop;

    fn bottom(ctx: &Self::LatticeContext) -> Self {
        Self(FixedBitSet::with_capacity(ctx.0))
    }

    fn join(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    fn join_into(&mut self, other: &Self, _ctx: &Self::LatticeContext) -> bool {
        if self.is_superset(other) {
            return false;
        }
        self.union_with(other);
        true
    }
}

impl Lattice for BitSet {
    fn top(ctx: &Self::LatticeContext) -> Self {
        let mut result = FixedBitSet::with_capacity(ctx.0);
        result.toggle_range(..);
        Self(result)
    }

    fn meet(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }
}

mod constant;
pub use constant::*;

mod transformers;
pub use transformers::*;

#[cfg(test)]
mod domains_tests;
