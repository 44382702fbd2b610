//! Stable instance identifiers with a LIFO free list.
//!
//! The `IdTable` maps each handed-out ID to the buffer slot its instance
//! currently occupies. Freed IDs go onto a stack and are handed out again
//! before any new ID is minted.

// IDs and slot indices are i32 in bytecode registers
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use vectorvm_foundation::{Error, ErrorKind, INDEX_NONE, InstanceId, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One slot of the ID table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct IdEntry {
    /// Buffer slot of the instance, or `INDEX_NONE` until placed.
    index: i32,
    /// Acquire tag stamped when handed out.
    tag: i32,
    /// Whether the ID is currently handed out.
    live: bool,
}

/// Allocates and tracks stable instance IDs for one dataset.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdTable {
    /// One entry per minted ID.
    entries: Vec<IdEntry>,
    /// Free IDs, popped from the back.
    free_ids: Vec<i32>,
    /// Highest ID ever minted, or `INDEX_NONE`.
    max_used_id: i32,
    /// Tag stamped on newly acquired IDs.
    acquire_tag: i32,
    /// Count of live IDs.
    live_count: usize,
}

impl Default for IdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IdTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_ids: Vec::new(),
            max_used_id: INDEX_NONE,
            acquire_tag: 0,
            live_count: 0,
        }
    }

    /// Hands out an ID, reusing the most recently freed one when available.
    pub fn acquire(&mut self) -> Result<InstanceId> {
        let id = if let Some(id) = self.free_ids.pop() {
            id
        } else {
            if self.max_used_id == i32::MAX {
                return Err(Error::new(ErrorKind::IdTableExhausted));
            }
            let id = self.max_used_id + 1;
            self.entries.push(IdEntry {
                index: INDEX_NONE,
                tag: self.acquire_tag,
                live: false,
            });
            id
        };

        self.max_used_id = self.max_used_id.max(id);
        let entry = &mut self.entries[id as usize];
        entry.live = true;
        entry.tag = self.acquire_tag;
        entry.index = INDEX_NONE;
        self.live_count += 1;

        Ok(InstanceId::new(id, self.acquire_tag))
    }

    /// Returns an ID to the free stack.
    ///
    /// Returns `Err` if the ID was never handed out or is already free.
    pub fn free(&mut self, id: i32) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if !entry.live {
            return Err(Error::new(ErrorKind::IdAlreadyFree(id)));
        }
        entry.live = false;
        entry.index = INDEX_NONE;
        self.free_ids.push(id);
        self.live_count -= 1;
        Ok(())
    }

    /// Records the buffer slot a live ID now occupies.
    ///
    /// A slot of `INDEX_NONE` means the instance did not survive and frees the ID.
    pub fn update(&mut self, id: i32, index: i32) -> Result<()> {
        if index == INDEX_NONE {
            return self.free(id);
        }
        let entry = self.entry_mut(id)?;
        if !entry.live {
            return Err(Error::new(ErrorKind::IdAlreadyFree(id)));
        }
        entry.index = index;
        Ok(())
    }

    /// Returns the buffer slot of a live ID, or `None` if it has not been placed.
    pub fn index_of(&self, id: InstanceId) -> Result<Option<i32>> {
        self.validate(id)?;
        let index = self.entries[id.index as usize].index;
        Ok((index != INDEX_NONE).then_some(index))
    }

    /// Validates that an ID is live and carries the current tag of its slot.
    pub fn validate(&self, id: InstanceId) -> Result<()> {
        let entry = self.entry(id.index)?;
        if !entry.live {
            return Err(Error::id_not_found(id.index));
        }
        if entry.tag != id.tag {
            return Err(Error::new(ErrorKind::StaleId {
                index: id.index,
                tag: id.tag,
                current: entry.tag,
            }));
        }
        Ok(())
    }

    /// Checks if an ID is currently handed out.
    #[must_use]
    pub fn is_live(&self, id: i32) -> bool {
        self.entry(id).is_ok_and(|e| e.live)
    }

    /// Clears every ID and advances the acquire tag.
    ///
    /// IDs handed out before the reset fail validation afterwards.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.free_ids.clear();
        self.max_used_id = INDEX_NONE;
        self.live_count = 0;
        self.acquire_tag = self.acquire_tag.wrapping_add(1);
    }

    /// Returns the tag stamped on newly acquired IDs.
    #[must_use]
    pub fn acquire_tag(&self) -> i32 {
        self.acquire_tag
    }

    /// Sets the tag stamped on newly acquired IDs.
    pub fn set_acquire_tag(&mut self, tag: i32) {
        self.acquire_tag = tag;
    }

    /// Returns the highest ID ever minted, or `INDEX_NONE`.
    #[must_use]
    pub fn max_used_id(&self) -> i32 {
        self.max_used_id
    }

    /// Returns the number of IDs on the free stack.
    #[must_use]
    pub fn num_free(&self) -> usize {
        self.free_ids.len()
    }

    /// Returns the free stack, bottom first.
    #[must_use]
    pub fn free_ids(&self) -> &[i32] {
        &self.free_ids
    }

    /// Returns the number of live IDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if no ID is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over all live IDs.
    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.live)
            .map(|(id, e)| InstanceId::new(id as i32, e.tag))
    }

    fn entry(&self, id: i32) -> Result<&IdEntry> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.entries.get(i))
            .ok_or_else(|| Error::id_not_found(id))
    }

    fn entry_mut(&mut self, id: i32) -> Result<&mut IdEntry> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.entries.get_mut(i))
            .ok_or_else(|| Error::id_not_found(id))
    }
}
