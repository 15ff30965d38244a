use test_log::test;

use super::context::*;
use super::manager::ObjId;
use crate::ir::{ClassId, MethodId, StmtId};

const CALLEE: MethodId = MethodId(0);

fn call(idx: u32) -> ContextElement {
    ContextElement::CallSite(StmtId(idx))
}

fn obj(idx: u32) -> ContextElement {
    ContextElement::Obj(ObjId(idx))
}

#[test]
fn insensitive_contexts_are_empty() {
    let selector = ContextInsensitive;
    let recv = ReceiverObj {
        heap_context: &[],
        obj: ObjId(1),
        container_type: None,
    };
    assert!(selector.select_context(&[], StmtId(3), CALLEE).is_empty());
    assert!(selector
        .select_receiver_context(&[], StmtId(3), &recv, CALLEE)
        .is_empty());
    assert!(selector.select_heap_context(&[], ObjId(1)).is_empty());
}

#[test]
fn call_sites_are_k_limited() {
    let selector = KCallSite { k: 2 };
    assert_eq!(selector.select_context(&[], StmtId(1), CALLEE), vec![call(1)]);
    assert_eq!(
        selector.select_context(&[call(1)], StmtId(2), CALLEE),
        vec![call(1), call(2)]
    );
    assert_eq!(
        selector.select_context(&[call(1), call(2)], StmtId(3), CALLEE),
        vec![call(2), call(3)]
    );
    assert_eq!(
        selector.select_heap_context(&[call(1), call(2)], ObjId(0)),
        vec![call(2)]
    );

    let recv = ReceiverObj {
        heap_context: &[obj(7)],
        obj: ObjId(8),
        container_type: None,
    };
    assert_eq!(
        selector.select_receiver_context(&[call(4)], StmtId(5), &recv, CALLEE),
        vec![call(4), call(5)]
    );
    assert!(KCallSite { k: 1 }
        .select_heap_context(&[call(1)], ObjId(0))
        .is_empty());
}

#[test]
fn receiver_objects_extend_heap_context() {
    let selector = KObject { k: 2 };
    let recv = ReceiverObj {
        heap_context: &[obj(1)],
        obj: ObjId(2),
        container_type: Some(ClassId(5)),
    };
    assert_eq!(
        selector.select_receiver_context(&[call(9)], StmtId(3), &recv, CALLEE),
        vec![obj(1), obj(2)]
    );
    // Static calls keep the context of the caller.
    assert_eq!(
        selector.select_context(&[obj(1), obj(2)], StmtId(3), CALLEE),
        vec![obj(1), obj(2)]
    );
    assert_eq!(
        selector.select_heap_context(&[obj(1), obj(2)], ObjId(4)),
        vec![obj(2)]
    );
    assert_eq!(
        KObject { k: 1 }.select_receiver_context(&[], StmtId(3), &recv, CALLEE),
        vec![obj(2)]
    );
}

#[test]
fn types_abstract_receivers() {
    let selector = KType { k: 2 };
    let allocated = ReceiverObj {
        heap_context: &[ContextElement::Type(ClassId(1))],
        obj: ObjId(2),
        container_type: Some(ClassId(3)),
    };
    assert_eq!(
        selector.select_receiver_context(&[], StmtId(0), &allocated, CALLEE),
        vec![ContextElement::Type(ClassId(1)), ContextElement::Type(ClassId(3))]
    );

    let literal = ReceiverObj {
        heap_context: &[],
        obj: ObjId(6),
        container_type: None,
    };
    assert_eq!(
        selector.select_receiver_context(&[], StmtId(0), &literal, CALLEE),
        vec![obj(6)]
    );
    assert_eq!(selector.name(), "2-type");
}
