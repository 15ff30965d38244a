use core::fmt::Debug;

use crate::ir::{ClassId, MethodId, StmtId};

use super::manager::ObjId;

/// An element of a context string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextElement {
    CallSite(StmtId),
    Obj(ObjId),
    Type(ClassId),
}

/// The receiver object of an instance call as seen by the selectors.
#[derive(Clone, Copy, Debug)]
pub struct ReceiverObj<'a> {
    pub heap_context: &'a [ContextElement],
    pub obj: ObjId,
    /// The class declaring the method that allocated the object.
    pub container_type: Option<ClassId>,
}

/// Chooses the contexts of callees and heap objects. Contexts are strings
/// of [`ContextElement`]s, the empty string is the context of the
/// entry methods.
pub trait ContextSelector {
    fn name(&self) -> String;

    /// The context of the callee of a static call.
    fn select_context(
        &self,
        caller_ctx: &[ContextElement],
        call_site: StmtId,
        callee: MethodId,
    ) -> Vec<ContextElement>;

    /// The context of the callee of an instance call.
    fn select_receiver_context(
        &self,
        caller_ctx: &[ContextElement],
        call_site: StmtId,
        recv: &ReceiverObj<'_>,
        callee: MethodId,
    ) -> Vec<ContextElement>;

    /// The context of an object allocated in a method analysed in `method_ctx`.
    fn select_heap_context(&self, method_ctx: &[ContextElement], obj: ObjId) -> Vec<ContextElement>;
}

/// Keep the last `limit` elements after appending `elem`.
fn append(ctx: &[ContextElement], elem: ContextElement, limit: usize) -> Vec<ContextElement> {
    if limit == 0 {
        return Vec::new();
    }
    let mut result: Vec<ContextElement> = ctx.to_vec();
    result.push(elem);
    let skip = result.len().saturating_sub(limit);
    result.split_off(skip)
}

fn last(ctx: &[ContextElement], limit: usize) -> Vec<ContextElement> {
    ctx[ctx.len().saturating_sub(limit)..].to_vec()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextInsensitive;

impl ContextSelector for ContextInsensitive {
    fn name(&self) -> String {
        "ci".to_owned()
    }

    fn select_context(&self, _: &[ContextElement], _: StmtId, _: MethodId) -> Vec<ContextElement> {
        Vec::new()
    }

    fn select_receiver_context(
        &self,
        _: &[ContextElement],
        _: StmtId,
        _: &ReceiverObj<'_>,
        _: MethodId,
    ) -> Vec<ContextElement> {
        Vec::new()
    }

    fn select_heap_context(&self, _: &[ContextElement], _: ObjId) -> Vec<ContextElement> {
        Vec::new()
    }
}

/// k-limited call-site sensitivity with a (k-1)-limited heap context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KCallSite {
    pub k: usize,
}

impl ContextSelector for KCallSite {
    fn name(&self) -> String {
        format!("{}-call", self.k)
    }

    fn select_context(
        &self,
        caller_ctx: &[ContextElement],
        call_site: StmtId,
        _callee: MethodId,
    ) -> Vec<ContextElement> {
        append(caller_ctx, ContextElement::CallSite(call_site), self.k)
    }

    fn select_receiver_context(
        &self,
        caller_ctx: &[ContextElement],
        call_site: StmtId,
        _recv: &ReceiverObj<'_>,
        callee: MethodId,
    ) -> Vec<ContextElement> {
        self.select_context(caller_ctx, call_site, callee)
    }

    fn select_heap_context(&self, method_ctx: &[ContextElement], _obj: ObjId) -> Vec<ContextElement> {
        last(method_ctx, self.k.saturating_sub(1))
    }
}

/// k-limited object sensitivity with a (k-1)-limited heap context. Static
/// calls inherit the context of the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KObject {
    pub k: usize,
}

impl ContextSelector for KObject {
    fn name(&self) -> String {
        format!("{}-obj", self.k)
    }

    fn select_context(
        &self,
        caller_ctx: &[ContextElement],
        _call_site: StmtId,
        _callee: MethodId,
    ) -> Vec<ContextElement> {
        caller_ctx.to_vec()
    }

    fn select_receiver_context(
        &self,
        _caller_ctx: &[ContextElement],
        _call_site: StmtId,
        recv: &ReceiverObj<'_>,
        _callee: MethodId,
    ) -> Vec<ContextElement> {
        append(recv.heap_context, ContextElement::Obj(recv.obj), self.k)
    }

    fn select_heap_context(&self, method_ctx: &[ContextElement], _obj: ObjId) -> Vec<ContextElement> {
        last(method_ctx, self.k.saturating_sub(1))
    }
}

/// k-limited type sensitivity: like object sensitivity, but the receiver
/// objects are abstracted by the class that allocated them. Objects without
/// an allocating method fall back to the object itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KType {
    pub k: usize,
}

impl ContextSelector for KType {
    fn name(&self) -> String {
        format!("{}-type", self.k)
    }

    fn select_context(
        &self,
        caller_ctx: &[ContextElement],
        _call_site: StmtId,
        _callee: MethodId,
    ) -> Vec<ContextElement> {
        caller_ctx.to_vec()
    }

    fn select_receiver_context(
        &self,
        _caller_ctx: &[ContextElement],
        _call_site: StmtId,
        recv: &ReceiverObj<'_>,
        _callee: MethodId,
    ) -> Vec<ContextElement> {
        let elem = match recv.container_type {
            Some(class) => ContextElement::Type(class),
            None => ContextElement::Obj(recv.obj),
        };
        append(recv.heap_context, elem, self.k)
    }

    fn select_heap_context(&self, method_ctx: &[ContextElement], _obj: ObjId) -> Vec<ContextElement> {
        last(method_ctx, self.k.saturating_sub(1))
    }
}
