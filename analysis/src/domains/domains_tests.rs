use crate::domains::*;

#[test]
fn const_domain_tests() {
    use ConstValue::*;
    // Comparisons
    assert_eq!(Const(1), Const(1));
    assert!(Undef <= Const(5));
    assert!(Const(5) <= Nac);
    assert!(Undef <= Nac);
    assert!(!(Const(1) <= Const(2)));
    assert!(!(Const(2) <= Const(1)));

    // Join
    assert_eq!(Undef.join_(&Const(3)), Const(3));
    assert_eq!(Const(3).join_(&Undef), Const(3));
    assert_eq!(Const(3).join_(&Const(3)), Const(3));
    assert_eq!(Const(3).join_(&Const(4)), Nac);
    assert_eq!(Nac.join_(&Const(4)), Nac);
    assert_eq!(Undef.join_(&Nac), Nac);
    assert_eq!(Undef.join_(&Undef), Undef);

    // Meet
    assert_eq!(Nac.meet_(&Const(3)), Const(3));
    assert_eq!(Const(3).meet_(&Const(4)), Undef);
    assert_eq!(Undef.meet_(&Const(4)), Undef);

    // Pretty printing
    assert_eq!(Const(-7).to_string(), "-7");
    assert_eq!(Nac.to_string(), "NAC");
    assert_eq!(Undef.to_string(), "UNDEF");
    assert_eq!(ConstValue::from_bool(true), Const(1));
    assert_eq!(Const(9).as_const(), Some(9));
    assert_eq!(Nac.as_const(), None);
}

#[test]
fn const_domain_join_laws() {
    use ConstValue::*;
    let values = [Undef, Const(0), Const(1), Const(i32::MIN), Nac];
    for a in values {
        assert_eq!(a.join_(&a), a);
        assert_eq!(a.join_(&Undef), a);
        assert_eq!(a.join_(&Nac), Nac);
        for b in values {
            assert_eq!(a.join_(&b), b.join_(&a));
            for c in values {
                assert_eq!(a.join_(&b).join_(&c), a.join_(&b.join_(&c)));
            }
        }
    }
}

#[test]
fn map_domain_tests() {
    use ConstValue::*;
    type Fact = MapDomain<&'static str, ConstValue>;

    let mut fact = Fact::new();
    assert_eq!(fact.get(&"x", &()), Undef);
    assert!(fact.update("x", Const(1), &()));
    assert!(!fact.update("x", Const(1), &()));
    assert_eq!(fact.get(&"x", &()), Const(1));

    // Updating to bottom removes the key.
    assert!(fact.update("x", Undef, &()));
    assert!(fact.is_empty());
    assert!(!fact.update("x", Undef, &()));

    let a: Fact = [("x", Const(1)), ("y", Const(2))].into_iter().collect();
    let b: Fact = [("x", Const(1)), ("y", Const(3)), ("z", Nac)].into_iter().collect();
    let joined = a.join(&b, &());
    assert_eq!(joined.get(&"x", &()), Const(1));
    assert_eq!(joined.get(&"y", &()), Nac);
    assert_eq!(joined.get(&"z", &()), Nac);
    assert_eq!(joined.len(), 3);

    // Keys missing from the source are untouched.
    let mut target = b.clone();
    let only_x: Fact = [("x", Const(1))].into_iter().collect();
    assert!(!target.join_into(&only_x, &()));
    assert_eq!(target, b);

    let mut copy = Fact::new();
    assert!(copy.copy_from(&a));
    assert!(!copy.copy_from(&a));
    assert_eq!(copy, a);

    assert_eq!(format!("{a:?}"), r#"{"x": Const(1), "y": Const(2)}"#);
}

#[test]
fn map_domain_ordering() {
    use ConstValue::*;
    type Fact = MapDomain<u32, ConstValue>;

    let bottom = Fact::bottom(&());
    let x1: Fact = [(0, Const(1))].into_iter().collect();
    let x_nac: Fact = [(0, Nac)].into_iter().collect();
    let y1: Fact = [(1, Const(1))].into_iter().collect();
    let x1_y1: Fact = [(0, Const(1)), (1, Const(1))].into_iter().collect();

    assert!(bottom <= x1);
    assert!(x1 <= x_nac);
    assert!(x1 <= x1_y1);
    assert!(y1 <= x1_y1);
    assert_eq!(x1.partial_cmp(&y1), None);
    assert_eq!(x1.join_(&y1), x1_y1);
}

#[test]
fn bitset_domain_tests() {
    let ctx = BitSetTop(4);
    let a = BitSet::from(&ctx, &[0, 1]);
    let b = BitSet::from(&ctx, &[1, 2]);
    let bottom = BitSet::bottom(&ctx);
    let top = BitSet::top(&ctx);

    assert!(bottom <= a);
    assert!(a <= top);
    assert_eq!(a.partial_cmp(&b), None);
    assert_eq!(a.join(&b, &ctx), BitSet::from(&ctx, &[0, 1, 2]));
    assert_eq!(a.meet(&b, &ctx), BitSet::from(&ctx, &[1]));

    let mut c = a.clone();
    assert!(c.join_into(&b, &ctx));
    assert!(!c.join_into(&b, &ctx));
    assert_eq!(format!("{c:?}"), "{0, 1, 2}");
}
