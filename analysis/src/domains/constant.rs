use core::cmp::Ordering;
use core::fmt::Display;

use crate::domains::*;

/// The flat lattice of 32-bit integer constants.
///
/// ```text
///            Nac
///   /   /   / | \   \   \
/// ... -2  -1  0  1   2  ...
///   \   \   \ | /   /   /
///           Undef
/// ```
///
/// `Undef` is the unit of the join: no value has been observed yet, or the
/// program point is unreachable. `Nac` (not a constant) absorbs everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConstValue {
    #[default]
    Undef,
    Const(i32),
    Nac,
}

impl ConstValue {
    pub fn as_const(self) -> Option<i32> {
        match self {
            ConstValue::Const(c) => Some(c),
            _ => None,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        ConstValue::Const(i32::from(b))
    }
}

impl Display for ConstValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConstValue::Undef => write!(f, "UNDEF"),
            ConstValue::Const(c) => write!(f, "{c}"),
            ConstValue::Nac => write!(f, "NAC"),
        }
    }
}

impl PartialOrd for ConstValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use ConstValue::*;
        match (self, other) {
            (a, b) if a == b => Some(Ordering::Equal),
            (Undef, _) | (_, Nac) => Some(Ordering::Less),
            (_, Undef) | (Nac, _) => Some(Ordering::Greater),
            (Const(_), Const(_)) => None,
        }
    }
}

impl JoinSemiLattice for ConstValue {
    type LatticeContext = ();

    fn bottom(_ctx: &Self::LatticeContext) -> Self {
        ConstValue::Undef
    }

    fn join(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        use ConstValue::*;
        match (*self, *other) {
            (Undef, x) | (x, Undef) => x,
            (Const(a), Const(b)) if a == b => Const(a),
            _ => Nac,
        }
    }
}

impl Lattice for ConstValue {
    fn top(_ctx: &Self::LatticeContext) -> Self {
        ConstValue::Nac
    }

    fn meet(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        use ConstValue::*;
        match (*self, *other) {
            (Nac, x) | (x, Nac) => x,
            (Const(a), Const(b)) if a == b => Const(a),
            _ => Undef,
        }
    }
}
