//! Register and instance identifier tests

use vectorvm_foundation::{INDEX_NONE, InstanceId, RegisterId};

#[test]
fn unused_register_sentinel() {
    assert!(RegisterId::UNUSED.is_unused());
    assert!(!RegisterId(0).is_unused());
    assert_eq!(RegisterId(12).index(), 12);
    assert_eq!(format!("{}", RegisterId(12)), "r12");
    assert_eq!(format!("{}", RegisterId::UNUSED), "r_");
}

#[test]
fn instance_id_sentinel() {
    let none = InstanceId::none();
    assert!(none.is_none());
    assert_eq!(none.index, INDEX_NONE);
    assert!(!InstanceId::new(0, 0).is_none());
}

#[test]
fn instance_ids_compare_by_index_and_tag() {
    assert_eq!(InstanceId::new(3, 1), InstanceId::new(3, 1));
    assert_ne!(InstanceId::new(3, 1), InstanceId::new(3, 2));
    assert_eq!(format!("{:?}", InstanceId::new(3, 1)), "InstanceId(3t1)");
}
