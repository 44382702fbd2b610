//! ID table tests

use proptest::prelude::*;
use vectorvm_dataset::IdTable;
use vectorvm_foundation::{ErrorKind, INDEX_NONE, InstanceId};

// =============================================================================
// Acquire / Free
// =============================================================================

#[test]
fn mints_sequential_ids_when_nothing_is_free() {
    let mut table = IdTable::new();
    let ids: Vec<i32> = (0..5).map(|_| table.acquire().unwrap().index).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert_eq!(table.max_used_id(), 4);
    assert_eq!(table.len(), 5);
}

#[test]
fn freed_ids_are_reused_last_in_first_out() {
    let mut table = IdTable::new();
    for _ in 0..10 {
        table.acquire().unwrap();
    }
    table.free(3).unwrap();
    table.free(7).unwrap();
    assert_eq!(table.free_ids(), &[3, 7]);

    assert_eq!(table.acquire().unwrap().index, 7);
    assert_eq!(table.acquire().unwrap().index, 3);
    assert_eq!(table.acquire().unwrap().index, 10);
}

#[test]
fn double_free_is_rejected() {
    let mut table = IdTable::new();
    let id = table.acquire().unwrap();
    table.free(id.index).unwrap();
    let err = table.free(id.index).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IdAlreadyFree(0));
    assert!(matches!(table.free(42).unwrap_err().kind, ErrorKind::IdNotFound(42)));
}

// =============================================================================
// Slot Tracking
// =============================================================================

#[test]
fn update_records_slot_and_none_frees() {
    let mut table = IdTable::new();
    let id = table.acquire().unwrap();
    assert_eq!(table.index_of(id).unwrap(), None);

    table.update(id.index, 12).unwrap();
    assert_eq!(table.index_of(id).unwrap(), Some(12));

    table.update(id.index, INDEX_NONE).unwrap();
    assert!(!table.is_live(id.index));
    assert_eq!(table.num_free(), 1);
}

#[test]
fn reset_makes_old_ids_stale() {
    let mut table = IdTable::new();
    let old = table.acquire().unwrap();
    table.reset();
    assert!(table.is_empty());

    let fresh = table.acquire().unwrap();
    assert_eq!(fresh.index, old.index);
    assert_ne!(fresh.tag, old.tag);
    assert!(matches!(
        table.validate(old).unwrap_err().kind,
        ErrorKind::StaleId { .. }
    ));
    assert!(table.validate(fresh).is_ok());
}

#[test]
fn iter_lists_live_ids() {
    let mut table = IdTable::new();
    for _ in 0..4 {
        table.acquire().unwrap();
    }
    table.free(1).unwrap();
    let live: Vec<InstanceId> = table.iter().collect();
    assert_eq!(
        live.iter().map(|id| id.index).collect::<Vec<_>>(),
        vec![0, 2, 3]
    );
}

proptest! {
    #[test]
    fn acquire_returns_each_freed_id_once(frees in proptest::collection::btree_set(0i32..32, 0..32)) {
        let mut table = IdTable::new();
        for _ in 0..32 {
            table.acquire().unwrap();
        }
        for &id in &frees {
            table.free(id).unwrap();
        }
        let mut reused: Vec<i32> = (0..frees.len()).map(|_| table.acquire().unwrap().index).collect();
        reused.sort_unstable();
        prop_assert_eq!(reused, frees.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(table.acquire().unwrap().index, 32);
    }
}
