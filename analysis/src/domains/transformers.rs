use core::cmp::Ordering;
use core::fmt::Debug;
use std::collections::BTreeMap;

use crate::domains::*;

/////////////////////////
// Domain transformers //
/////////////////////////

/// The map lattice, lifting a value lattice pointwise to a mapping from
/// keys to values. Absent keys are implicitly mapped to the bottom of the
/// value lattice, and the map never stores bottom values explicitly, so two
/// maps are equal exactly when they agree on every key.
#[derive(PartialEq, Eq, Clone)]
pub struct MapDomain<K: Ord + Clone + Debug, V: JoinSemiLattice>(BTreeMap<K, V>);

impl<K: Ord + Clone + Debug, V: JoinSemiLattice> Default for MapDomain<K, V> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<K: Ord + Clone + Debug, V: JoinSemiLattice> MapDomain<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K, ctx: &V::LatticeContext) -> V {
        self.0.get(key).cloned().unwrap_or_else(|| V::bottom(ctx))
    }

    /// Set the value of `key`. Setting a key to bottom removes it.
    /// Returns whether the mapping changed.
    pub fn update(&mut self, key: K, value: V, ctx: &V::LatticeContext) -> bool {
        if value == V::bottom(ctx) {
            return self.0.remove(&key).is_some();
        }
        match self.0.insert(key, value.clone()) {
            Some(old) => old != value,
            None => true,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.0.remove(key)
    }

    /// Overwrite the contents with the contents of `other`. Returns whether
    /// the mapping changed.
    pub fn copy_from(&mut self, other: &Self) -> bool {
        if self.0 == other.0 {
            return false;
        }
        self.0.clone_from(&other.0);
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<K: Ord + Clone + Debug, V: JoinSemiLattice> FromIterator<(K, V)> for MapDomain<K, V>
where
    V::LatticeContext: Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let ctx = V::LatticeContext::default();
        let mut result = Self::new();
        for (k, v) in iter {
            result.update(k, v, &ctx);
        }
        result
    }
}

impl<K: Ord + Clone + Debug, V: JoinSemiLattice> Debug for MapDomain<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Ord + Clone + Debug, V: JoinSemiLattice> PartialOrd for MapDomain<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let mut result = Ordering::Equal;
        let keys = self.0.keys().chain(other.0.keys());
        for key in keys {
            let ord = match (self.0.get(key), other.0.get(key)) {
                (Some(a), Some(b)) => a.partial_cmp(b)?,
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            result = match (result, ord) {
                (r, Ordering::Equal) => r,
                (Ordering::Equal, o) => o,
                (r, o) if r == o => r,
                _ => return None,
            };
        }
        Some(result)
    }
}

impl<K: Ord + Clone + Debug, V: JoinSemiLattice> JoinSemiLattice for MapDomain<K, V> {
    type LatticeContext = V::LatticeContext;

    fn bottom(_ctx: &Self::LatticeContext) -> Self {
        Self::new()
    }

    fn join(&self, other: &Self, ctx: &Self::LatticeContext) -> Self {
        let mut result = self.clone();
        result.join_into(other, ctx);
        result
    }

    /// Keys missing from `other` are left untouched.
    fn join_into(&mut self, other: &Self, ctx: &Self::LatticeContext) -> bool {
        let mut changed = false;
        for (key, value) in &other.0 {
            let joined = match self.0.get(key) {
                Some(old) => old.join(value, ctx),
                None => value.clone(),
            };
            changed |= self.update(key.clone(), joined, ctx);
        }
        changed
    }
}
