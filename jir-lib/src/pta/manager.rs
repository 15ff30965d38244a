use core::hash::Hash;
use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::ir::{FieldId, MethodId, StmtId, Type, VarId};

use super::context::ContextElement;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_id!(ContextId);
define_id!(ObjId);
define_id!(CSObjId);
define_id!(CSMethodId);
define_id!(CSCallSiteId);
define_id!(PointerId);

impl ContextId {
    /// The context of the entry methods.
    pub const EMPTY: ContextId = ContextId(0);
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjKind {
    /// Allocated by a `new` expression.
    Alloc(StmtId),
    /// All occurrences of the same string literal.
    StringLiteral(String),
    /// Taint introduced by a source call.
    Taint { source: StmtId },
}

/// An abstract heap object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Obj {
    pub kind: ObjKind,
    pub ty: Type,
    /// The method allocating the object.
    pub container: Option<MethodId>,
}

impl Obj {
    pub fn is_taint(&self) -> bool {
        matches!(self.kind, ObjKind::Taint { .. })
    }

    pub fn taint_source(&self) -> Option<StmtId> {
        match self.kind {
            ObjKind::Taint { source } => Some(source),
            _ => None,
        }
    }
}

/// The nodes of the pointer flow graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pointer {
    Var(ContextId, VarId),
    StaticField(FieldId),
    InstanceField(CSObjId, FieldId),
    /// All the elements of an array object.
    ArrayIndex(CSObjId),
}

/// A set of context-sensitive objects.
#[derive(Clone, Default)]
pub struct PointsToSet(FixedBitSet);

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: CSObjId) -> Self {
        let mut result = Self::new();
        result.add(obj);
        result
    }

    /// Returns true when the object was not in the set.
    pub fn add(&mut self, obj: CSObjId) -> bool {
        if obj.index() >= self.0.len() {
            self.0.grow(obj.index() + 1);
        }
        !self.0.put(obj.index())
    }

    pub fn contains(&self, obj: CSObjId) -> bool {
        self.0.contains(obj.index())
    }

    pub fn union_with(&mut self, other: &Self) {
        if other.0.len() > self.0.len() {
            self.0.grow(other.0.len());
        }
        self.0.union_with(&other.0);
    }

    /// The objects in `other` missing from `self`.
    pub fn missing_from(&self, other: &Self) -> Self {
        let mut result = other.0.clone();
        result.difference_with(&self.0);
        Self(result)
    }

    pub fn iter(&self) -> impl Iterator<Item = CSObjId> + '_ {
        self.0.ones().map(CSObjId::from_index)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_clear()
    }
}

impl core::fmt::Debug for PointsToSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Hands out dense ids to the values it is given, returning the same id for
/// equal values.
#[derive(Clone, Debug)]
struct Interner<T> {
    values: Vec<T>,
    ids: HashMap<T, u32>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            ids: HashMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Interner<T> {
    fn intern(&mut self, value: T) -> usize {
        if let Some(&id) = self.ids.get(&value) {
            return id as usize;
        }
        let id = self.values.len();
        self.values.push(value.clone());
        self.ids.insert(value, id as u32);
        id
    }

    fn get(&self, value: &T) -> Option<usize> {
        self.ids.get(value).map(|&id| id as usize)
    }

    fn value(&self, id: usize) -> &T {
        &self.values[id]
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

/// Owns the contexts, the abstract objects, the context-sensitive entities
/// and the points-to sets of the pointers. Every `(context, entity)` pair is
/// represented by a unique id.
#[derive(Clone, Debug)]
pub struct CSManager {
    contexts: Interner<Vec<ContextElement>>,
    obj_keys: Interner<(ObjKind, Type)>,
    objs: Vec<Obj>,
    cs_objs: Interner<(ContextId, ObjId)>,
    cs_methods: Interner<(ContextId, MethodId)>,
    cs_call_sites: Interner<(ContextId, StmtId)>,
    pointers: Interner<Pointer>,
    points_to: Vec<PointsToSet>,
}

impl Default for CSManager {
    fn default() -> Self {
        let mut contexts = Interner::default();
        contexts.intern(Vec::new());
        Self {
            contexts,
            obj_keys: Interner::default(),
            objs: Vec::new(),
            cs_objs: Interner::default(),
            cs_methods: Interner::default(),
            cs_call_sites: Interner::default(),
            pointers: Interner::default(),
            points_to: Vec::new(),
        }
    }
}

impl CSManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&mut self, elements: Vec<ContextElement>) -> ContextId {
        ContextId::from_index(self.contexts.intern(elements))
    }

    pub fn context_elements(&self, ctx: ContextId) -> &[ContextElement] {
        self.contexts.value(ctx.index())
    }

    /// The object of a given kind and type, created on first request.
    pub fn obj(&mut self, kind: ObjKind, ty: Type, container: Option<MethodId>) -> ObjId {
        let id = self.obj_keys.intern((kind.clone(), ty.clone()));
        if id == self.objs.len() {
            self.objs.push(Obj {
                kind,
                ty,
                container,
            });
        }
        ObjId::from_index(id)
    }

    pub fn obj_data(&self, obj: ObjId) -> &Obj {
        &self.objs[obj.index()]
    }

    pub fn cs_obj(&mut self, ctx: ContextId, obj: ObjId) -> CSObjId {
        CSObjId::from_index(self.cs_objs.intern((ctx, obj)))
    }

    pub fn cs_obj_data(&self, obj: CSObjId) -> (ContextId, ObjId) {
        *self.cs_objs.value(obj.index())
    }

    pub fn cs_obj_count(&self) -> usize {
        self.cs_objs.len()
    }

    pub fn cs_method(&mut self, ctx: ContextId, method: MethodId) -> CSMethodId {
        CSMethodId::from_index(self.cs_methods.intern((ctx, method)))
    }

    pub fn cs_method_data(&self, method: CSMethodId) -> (ContextId, MethodId) {
        *self.cs_methods.value(method.index())
    }

    pub fn cs_call_site(&mut self, ctx: ContextId, call_site: StmtId) -> CSCallSiteId {
        CSCallSiteId::from_index(self.cs_call_sites.intern((ctx, call_site)))
    }

    pub fn cs_call_site_data(&self, call_site: CSCallSiteId) -> (ContextId, StmtId) {
        *self.cs_call_sites.value(call_site.index())
    }

    pub fn pointer(&mut self, pointer: Pointer) -> PointerId {
        let id = self.pointers.intern(pointer);
        if id == self.points_to.len() {
            self.points_to.push(PointsToSet::new());
        }
        PointerId::from_index(id)
    }

    pub fn var_pointer(&mut self, ctx: ContextId, var: VarId) -> PointerId {
        self.pointer(Pointer::Var(ctx, var))
    }

    /// The id of an existing pointer.
    pub fn find_pointer(&self, pointer: &Pointer) -> Option<PointerId> {
        self.pointers.get(pointer).map(PointerId::from_index)
    }

    pub fn pointer_data(&self, pointer: PointerId) -> Pointer {
        *self.pointers.value(pointer.index())
    }

    pub fn pointers(&self) -> impl Iterator<Item = (PointerId, Pointer)> + '_ {
        (0..self.pointers.len()).map(|idx| (PointerId::from_index(idx), *self.pointers.value(idx)))
    }

    pub fn points_to(&self, pointer: PointerId) -> &PointsToSet {
        &self.points_to[pointer.index()]
    }

    pub fn points_to_mut(&mut self, pointer: PointerId) -> &mut PointsToSet {
        &mut self.points_to[pointer.index()]
    }
}
