//! The integer-keyed map abstraction every row of a [`DualKeyMap`](crate::DualKeyMap) uses.

use crate::Result;

/// A map from `i32` to a value, iterated in ascending key order.
///
/// Two implementations ship with the crate: [`RadixTrie`](crate::RadixTrie), which covers the
/// whole `i32` domain and stays compact for sparse keys, and
/// [`ArrayIntMap`](crate::ArrayIntMap), a flat array for dense non-negative keys.
pub trait IntKeyMap: Default {
    type Value;

    /// Ascending `(key, value)` iterator.
    type Iter<'a>: Iterator<Item = (i32, &'a Self::Value)>
    where
        Self: 'a;

    /// Checks whether `key` can be stored without inserting anything.
    ///
    /// A key that passes this check never makes [`insert`](IntKeyMap::insert) fail.
    fn check_key(key: i32) -> Result<()> {
        let _ = key;
        Ok(())
    }

    /// Stores `value` under `key`, returning the value it replaced.
    fn insert(&mut self, key: i32, value: Self::Value) -> Result<Option<Self::Value>>;

    fn get(&self, key: i32) -> Option<&Self::Value>;

    fn get_mut(&mut self, key: i32) -> Option<&mut Self::Value>;

    fn remove(&mut self, key: i32) -> Option<Self::Value>;

    fn len(&self) -> usize;

    fn clear(&mut self);

    fn iter(&self) -> Self::Iter<'_>;

    /// Approximate heap and inline bytes owned by the map.
    fn memory_usage(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn contains_key(&self, key: i32) -> bool {
        self.get(key).is_some()
    }
}
