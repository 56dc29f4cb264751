//! Flat, directly indexed integer map for dense non-negative keys.

use std::fmt;
use std::iter::Enumerate;
use std::slice;

use tracing::debug;

use crate::int_map::IntKeyMap;
use crate::{Error, Result};

const DEFAULT_CAPACITY: usize = 10;

/// Largest number of slots the array may grow to.
pub const MAX_CAPACITY: usize = i32::MAX as usize - 8;

/// An integer map backed by a growable array of optional values.
///
/// Lookups are a bounds check plus an index. Keys must be non-negative and the array is
/// sized by the largest key ever stored, so this map pays off when a row's keys are densely
/// packed from zero.
#[derive(Clone)]
pub struct ArrayIntMap<V> {
    slots: Vec<Option<V>>,
    /// One past the highest key ever stored; scans never look beyond it.
    end: usize,
    len: usize,
}

impl<V> ArrayIntMap<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_CAPACITY);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            end: 0,
            len: 0,
        }
    }

    /// Copies every entry of `other`, sizing the array to its largest key.
    pub fn from_int_map<M>(other: &M) -> Result<Self>
    where
        M: IntKeyMap<Value = V>,
        V: Clone,
    {
        let mut largest = None;
        for (key, _) in other.iter() {
            Self::check_key(key)?;
            largest = Some(largest.map_or(key, |k: i32| k.max(key)));
        }
        let mut map = Self::with_capacity(largest.map_or(DEFAULT_CAPACITY, |k| k as usize + 1));
        for (key, value) in other.iter() {
            map.insert(key, value.clone())?;
        }
        Ok(map)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn get(&self, key: i32) -> Option<&V> {
        let idx = usize::try_from(key).ok()?;
        if idx >= self.end {
            return None;
        }
        self.slots[idx].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        let idx = usize::try_from(key).ok()?;
        if idx >= self.end {
            return None;
        }
        self.slots[idx].as_mut()
    }

    pub fn insert(&mut self, key: i32, value: V) -> Result<Option<V>> {
        Self::check_key(key)?;
        let idx = key as usize;
        if idx >= self.slots.len() {
            self.grow(idx + 1);
        }
        let previous = self.slots[idx].replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        if idx >= self.end {
            self.end = idx + 1;
        }
        Ok(previous)
    }

    pub fn remove(&mut self, key: i32) -> Option<V> {
        let idx = usize::try_from(key).ok()?;
        if idx >= self.end {
            return None;
        }
        let previous = self.slots[idx].take();
        if previous.is_some() {
            self.len -= 1;
        }
        previous
    }

    /// Removes every entry but keeps the allocated slots.
    pub fn clear(&mut self) {
        for slot in &mut self.slots[..self.end] {
            *slot = None;
        }
        self.end = 0;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots[..self.end].iter().enumerate(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.slots.capacity() * std::mem::size_of::<Option<V>>()
    }

    /// Drops the slots past the highest live key.
    pub fn shrink_to_fit(&mut self) {
        let live_end = self.slots[..self.end]
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |idx| idx + 1);
        self.end = live_end;
        self.slots.truncate(live_end);
        self.slots.shrink_to_fit();
    }

    /// Grows the array to hold at least `needed` slots; callers have already checked
    /// `needed <= MAX_CAPACITY`.
    fn grow(&mut self, needed: usize) {
        let current = self.slots.len();
        let target = (current + (current >> 1)).max(needed).min(MAX_CAPACITY);
        debug!(from = current, to = target, "growing array map");
        self.slots.reserve_exact(target - current);
        self.slots.resize_with(target, || None);
    }
}

impl<V> IntKeyMap for ArrayIntMap<V> {
    type Value = V;
    type Iter<'a>
        = Iter<'a, V>
    where
        Self: 'a;

    fn check_key(key: i32) -> Result<()> {
        if key < 0 {
            return Err(Error::NegativeKey(key));
        }
        if key as usize + 1 > MAX_CAPACITY {
            return Err(Error::KeyOutOfRange {
                key,
                max: MAX_CAPACITY,
            });
        }
        Ok(())
    }

    #[inline]
    fn insert(&mut self, key: i32, value: V) -> Result<Option<V>> {
        ArrayIntMap::insert(self, key, value)
    }

    #[inline]
    fn get(&self, key: i32) -> Option<&V> {
        ArrayIntMap::get(self, key)
    }

    #[inline]
    fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        ArrayIntMap::get_mut(self, key)
    }

    #[inline]
    fn remove(&mut self, key: i32) -> Option<V> {
        ArrayIntMap::remove(self, key)
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        ArrayIntMap::clear(self)
    }

    fn iter(&self) -> Iter<'_, V> {
        ArrayIntMap::iter(self)
    }

    fn memory_usage(&self) -> usize {
        ArrayIntMap::memory_usage(self)
    }
}

impl<V> Default for ArrayIntMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for ArrayIntMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for ArrayIntMap<V> {}

impl<V: fmt::Debug> fmt::Debug for ArrayIntMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a ArrayIntMap<V> {
    type Item = (i32, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over an [`ArrayIntMap`], skipping empty slots.
pub struct Iter<'a, V> {
    slots: Enumerate<slice::Iter<'a, Option<V>>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (i32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for (idx, slot) in self.slots.by_ref() {
            if let Some(value) = slot {
                self.remaining -= 1;
                return Some((idx as i32, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
