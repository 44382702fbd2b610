//! Per-dataset metadata shared by every chunk of one execution.
//!
//! Two pieces of a `DataSetMeta` are mutated concurrently while chunks run:
//! the append cursor, an atomic counter that hands out output slots, and the
//! ID table, which sits behind a lock. Everything else is fixed at bind time.
//!
//! Freeing an ID twice or updating one that was never handed out corrupts the
//! table. The first such error faults the dataset: ID operations fail with
//! `DataSetFaulted` and no output slots are handed out until [`reset_ids`]
//! runs.
//!
//! [`reset_ids`]: DataSetMeta::reset_ids

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;
use vectorvm_foundation::{Error, ErrorKind, INDEX_NONE, InstanceId, Result};

use crate::id_table::IdTable;

/// Describes one bound dataset for the VM.
#[derive(Debug)]
pub struct DataSetMeta {
    /// First input register holding this dataset's columns.
    pub input_register_offset: u16,
    /// First output register holding this dataset's columns.
    pub output_register_offset: u16,
    /// Number of 32-bit columns.
    pub num_variables: u16,
    /// Read position added to every input access.
    pub instance_offset: usize,
    /// Number of output slots that can be appended.
    capacity: usize,
    /// Next free output slot.
    cursor: AtomicUsize,
    /// Stable IDs for this dataset's instances.
    ids: Mutex<IdTable>,
    /// Set once the ID table has been corrupted.
    faulted: AtomicBool,
}

impl DataSetMeta {
    /// Creates metadata for a dataset with the given column count and capacity.
    #[must_use]
    pub fn new(num_variables: u16, capacity: usize) -> Self {
        Self {
            input_register_offset: 0,
            output_register_offset: 0,
            num_variables,
            instance_offset: 0,
            capacity,
            cursor: AtomicUsize::new(0),
            ids: Mutex::new(IdTable::new()),
            faulted: AtomicBool::new(false),
        }
    }

    /// Sets the register offsets of this dataset's columns.
    #[must_use]
    pub fn with_register_offsets(mut self, input: u16, output: u16) -> Self {
        self.input_register_offset = input;
        self.output_register_offset = output;
        self
    }

    /// Sets the read position added to every input access.
    #[must_use]
    pub fn with_instance_offset(mut self, offset: usize) -> Self {
        self.instance_offset = offset;
        self
    }

    /// Returns the number of output slots that can be appended.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity and rewinds the append cursor.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        *self.cursor.get_mut() = 0;
    }

    /// Returns the number of output slots handed out so far.
    #[must_use]
    pub fn append_count(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Rewinds the append cursor.
    pub fn reset_cursor(&self) {
        self.cursor.store(0, Ordering::Release);
    }

    /// Reserves up to `count` consecutive output slots.
    ///
    /// The returned range is shorter than `count` when capacity runs out and
    /// empty once the dataset is full or faulted. The cursor never passes
    /// capacity.
    pub fn acquire_indices(&self, count: usize) -> Range<usize> {
        if count == 0 || self.is_faulted() {
            let at = self.append_count();
            return at..at;
        }
        let capacity = self.capacity;
        let prev = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some(cur + count.min(capacity.saturating_sub(cur)))
            })
            .unwrap_or_else(|cur| cur);
        prev..prev + count.min(capacity.saturating_sub(prev))
    }

    /// Reserves one output slot for a valid instance.
    ///
    /// Returns `INDEX_NONE` without touching the cursor when `is_valid` is false,
    /// and when the dataset is full.
    pub fn acquire_index(&self, is_valid: bool) -> i32 {
        if !is_valid {
            return INDEX_NONE;
        }
        let slots = self.acquire_indices(1);
        if slots.is_empty() {
            INDEX_NONE
        } else {
            slots.start as i32
        }
    }

    /// Returns true once the ID table has been corrupted.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// Fails with `DataSetFaulted` if the ID table has been corrupted.
    pub fn ensure_healthy(&self) -> Result<()> {
        if self.is_faulted() {
            return Err(Error::new(ErrorKind::DataSetFaulted));
        }
        Ok(())
    }

    /// Faults the dataset if `err` left the ID table inconsistent.
    ///
    /// Returns the error unchanged so it can be used in `map_err`.
    pub fn track_id_error(&self, err: Error) -> Error {
        if err.kind.corrupts_id_table() && !self.faulted.swap(true, Ordering::AcqRel) {
            warn!(error = %err, "instance ID table corrupted, dataset faulted");
        }
        err
    }

    /// Clears the ID table, the append cursor, and the fault flag.
    pub fn reset_ids(&mut self) -> Result<()> {
        self.ids_mut()?.reset();
        *self.cursor.get_mut() = 0;
        *self.faulted.get_mut() = false;
        Ok(())
    }

    /// Locks the ID table.
    pub fn lock_ids(&self) -> Result<MutexGuard<'_, IdTable>> {
        self.ensure_healthy()?;
        self.ids
            .lock()
            .map_err(|_| Error::internal("instance ID table lock poisoned"))
    }

    /// Gives mutable access to the ID table without locking.
    ///
    /// Works on a faulted dataset so the table can be inspected or repaired.
    pub fn ids_mut(&mut self) -> Result<&mut IdTable> {
        self.ids
            .get_mut()
            .map_err(|_| Error::internal("instance ID table lock poisoned"))
    }

    /// Hands out a stable ID.
    pub fn acquire_id(&self) -> Result<InstanceId> {
        self.lock_ids()?
            .acquire()
            .map_err(|err| self.track_id_error(err))
    }

    /// Returns an ID to the free stack.
    pub fn free_id(&self, id: i32) -> Result<()> {
        self.lock_ids()?
            .free(id)
            .map_err(|err| self.track_id_error(err))
    }

    /// Records the output slot of a live ID; `INDEX_NONE` frees it.
    pub fn update_id(&self, id: i32, index: i32) -> Result<()> {
        self.lock_ids()?
            .update(id, index)
            .map_err(|err| self.track_id_error(err))
    }
}
