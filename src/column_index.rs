//! Interning table that gives every distinct column key a stable small integer.
//!
//! Each column key object is stored once, in an append-only list of slots. The hash table
//! only holds slot numbers and finds keys by hashing through that list. A slot whose reference
//! count drops to zero is emptied but its number is never handed out again, so the list can
//! accumulate holes; each hole costs one empty slot.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use hashbrown::{DefaultHashBuilder, HashTable};
use tracing::trace;

use crate::{Error, Result};

#[derive(Clone)]
struct ColumnSlot<C> {
    key: C,
    /// Number of `(row, column)` pairs currently using this column.
    refs: u32,
}

/// Bidirectional map between column keys and reference-counted integer indices.
#[derive(Clone)]
pub struct ColumnIndex<C> {
    table: HashTable<u32>,
    slots: Vec<Option<ColumnSlot<C>>>,
    hasher: DefaultHashBuilder,
}

fn slot_hash<C: Hash>(
    hasher: &DefaultHashBuilder,
    slots: &[Option<ColumnSlot<C>>],
    idx: u32,
) -> u64 {
    match &slots[idx as usize] {
        Some(slot) => hasher.hash_one(&slot.key),
        None => 0,
    }
}

impl<C> ColumnIndex<C> {
    /// Number of live columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The index the next new column will receive.
    #[inline]
    pub fn next_index(&self) -> usize {
        self.slots.len()
    }

    /// Resolves a live index back to its column key.
    #[inline]
    pub fn resolve(&self, index: i32) -> Option<&C> {
        let idx = usize::try_from(index).ok()?;
        self.slots.get(idx)?.as_ref().map(|slot| &slot.key)
    }

    /// Number of pairs using the column at `index`.
    pub fn refs(&self, index: i32) -> u32 {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.slots.get(idx))
            .and_then(Option::as_ref)
            .map_or(0, |slot| slot.refs)
    }

    /// Live column keys in index order.
    pub fn keys(&self) -> Keys<'_, C> {
        Keys {
            slots: self.slots.iter(),
            remaining: self.table.len(),
        }
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.table.capacity() * (std::mem::size_of::<u32>() + 1)
            + self.slots.capacity() * std::mem::size_of::<Option<ColumnSlot<C>>>()
    }
}

impl<C: Hash + Eq> ColumnIndex<C> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            hasher: DefaultHashBuilder::default(),
        }
    }

    /// Looks `column` up without allocating a slot.
    pub fn index_of<Q>(&self, column: &Q) -> Option<i32>
    where
        C: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hasher.hash_one(column);
        let slots = &self.slots;
        self.table
            .find(hash, |&idx| {
                slots[idx as usize]
                    .as_ref()
                    .is_some_and(|slot| <C as Borrow<Q>>::borrow(&slot.key) == column)
            })
            .map(|&idx| idx as i32)
    }

    #[inline]
    pub fn contains<Q>(&self, column: &Q) -> bool
    where
        C: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index_of(column).is_some()
    }

    /// Returns the index of `column`, allocating the next one if it is new.
    ///
    /// A freshly allocated slot starts with no references; pair it with
    /// [`acquire`](Self::acquire) or give it back with [`discard_unused`](Self::discard_unused).
    pub fn intern(&mut self, column: C) -> Result<i32> {
        let hash = self.hasher.hash_one(&column);
        let slots = &self.slots;
        let found = self.table.find(hash, |&idx| {
            slots[idx as usize]
                .as_ref()
                .is_some_and(|slot| slot.key == column)
        });
        if let Some(&idx) = found {
            return Ok(idx as i32);
        }

        let idx = i32::try_from(self.slots.len()).map_err(|_| Error::KeyOutOfRange {
            key: i32::MAX,
            max: i32::MAX as usize,
        })?;
        let hasher = &self.hasher;
        let slots = &self.slots;
        self.table
            .insert_unique(hash, idx as u32, |&i| slot_hash(hasher, slots, i));
        self.slots.push(Some(ColumnSlot {
            key: column,
            refs: 0,
        }));
        trace!(index = idx, "column slot allocated");
        Ok(idx)
    }

    /// Records one more pair using the column at `index`.
    pub fn acquire(&mut self, index: i32) {
        if let Some(slot) = self.slot_mut(index) {
            slot.refs += 1;
        }
    }

    /// Drops one pair's reference to the column at `index`. Returns the column key once the
    /// last reference is gone and the slot has been emptied.
    pub fn release(&mut self, index: i32) -> Option<C> {
        let slot = self.slot_mut(index)?;
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs > 0 {
            return None;
        }
        self.free(index)
    }

    /// Empties the slot at `index` if nothing references it.
    pub fn discard_unused(&mut self, index: i32) -> Option<C> {
        if self.slot_mut(index)?.refs > 0 {
            return None;
        }
        self.free(index)
    }

    /// Removes every column and restarts numbering from zero.
    pub fn clear(&mut self) {
        self.table.clear();
        self.slots.clear();
    }

    fn slot_mut(&mut self, index: i32) -> Option<&mut ColumnSlot<C>> {
        let idx = usize::try_from(index).ok()?;
        self.slots.get_mut(idx)?.as_mut()
    }

    fn free(&mut self, index: i32) -> Option<C> {
        let idx = index as u32;
        let hash = slot_hash(&self.hasher, &self.slots, idx);
        if let Ok(entry) = self.table.find_entry(hash, |&i| i == idx) {
            let _ = entry.remove();
        }
        let slot = self.slots.get_mut(idx as usize)?.take()?;
        trace!(index, "column slot freed");
        Some(slot.key)
    }
}

impl<C: Hash + Eq> Default for ColumnIndex<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: fmt::Debug> fmt::Debug for ColumnIndex<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, slot)| slot.as_ref().map(|s| (idx, (&s.key, s.refs)))),
            )
            .finish()
    }
}

/// Live column keys of a [`ColumnIndex`], in index order.
pub struct Keys<'a, C> {
    slots: std::slice::Iter<'a, Option<ColumnSlot<C>>>,
    remaining: usize,
}

impl<'a, C> Iterator for Keys<'a, C> {
    type Item = &'a C;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some(slot) = slot {
                self.remaining -= 1;
                return Some(&slot.key);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<C> ExactSizeIterator for Keys<'_, C> {}
