//! Append cursor tests

use std::sync::Arc;
use std::thread;

use vectorvm_dataset::DataSetMeta;
use vectorvm_foundation::INDEX_NONE;

#[test]
fn acquire_index_hands_out_consecutive_slots() {
    let meta = DataSetMeta::new(1, 4);
    assert_eq!(meta.acquire_index(true), 0);
    assert_eq!(meta.acquire_index(false), INDEX_NONE);
    assert_eq!(meta.acquire_index(true), 1);
    assert_eq!(meta.append_count(), 2);
}

#[test]
fn cursor_clamps_at_capacity() {
    let meta = DataSetMeta::new(1, 5);
    assert_eq!(meta.acquire_indices(3), 0..3);
    assert_eq!(meta.acquire_indices(3), 3..5);
    assert_eq!(meta.acquire_indices(3), 5..5);
    assert_eq!(meta.acquire_index(true), INDEX_NONE);
    assert_eq!(meta.append_count(), 5);

    meta.reset_cursor();
    assert_eq!(meta.append_count(), 0);
}

#[test]
fn concurrent_reservations_never_overlap() {
    let meta = Arc::new(DataSetMeta::new(1, 1000));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let meta = Arc::clone(&meta);
            thread::spawn(move || {
                (0..50)
                    .flat_map(|_| meta.acquire_indices(3))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut slots: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    slots.sort_unstable();
    assert_eq!(slots, (0..1000).collect::<Vec<_>>());
    assert_eq!(meta.append_count(), 1000);
}

#[test]
fn locked_id_table_is_shared() {
    let meta = DataSetMeta::new(1, 0);
    let id = meta.acquire_id().unwrap();
    meta.update_id(id.index, 4).unwrap();
    assert_eq!(meta.lock_ids().unwrap().index_of(id).unwrap(), Some(4));
    meta.free_id(id.index).unwrap();
    assert_eq!(meta.lock_ids().unwrap().num_free(), 1);
}
