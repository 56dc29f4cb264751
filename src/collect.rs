//! Building maps and sets from iterators.
//!
//! `collect()` into a [`DualKeyMap`] keeps the last value for a repeated key. The functions
//! here cover the other policies: reject repeats with [`Error::DuplicateKey`], or fold them
//! with a merge function. The `_with` variants take key and value extractors so any item type
//! can be collected.

use std::fmt::Debug;
use std::hash::Hash;

use crate::{DualKeyMap, DualKeySet, Error, IntKeyMap, Result};

/// Collects `(row, column, value)` triples, failing on the first repeated `(row, column)`.
pub fn collect_unique<R, C, V, M, I>(iter: I) -> Result<DualKeyMap<R, C, V, M>>
where
    R: Hash + Eq + Debug,
    C: Hash + Eq + Debug,
    M: IntKeyMap<Value = V>,
    I: IntoIterator<Item = (R, C, V)>,
{
    let mut map = DualKeyMap::new();
    for (row, column, value) in iter {
        if map.contains_key(&row, &column) {
            return Err(Error::DuplicateKey {
                row: format!("{row:?}"),
                column: format!("{column:?}"),
            });
        }
        map.insert(row, column, value)?;
    }
    Ok(map)
}

/// Collects `(row, column, value)` triples, folding a repeated key's values with
/// `merge(existing, incoming)`.
pub fn collect_merging<R, C, V, M, I, F>(iter: I, mut merge: F) -> Result<DualKeyMap<R, C, V, M>>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V>,
    I: IntoIterator<Item = (R, C, V)>,
    F: FnMut(&V, V) -> V,
{
    let mut map = DualKeyMap::new();
    for (row, column, value) in iter {
        map.merge(row, column, value, |old, new| Some(merge(old, new)))?;
    }
    Ok(map)
}

/// [`collect_unique`] over arbitrary items, with the key parts and value pulled out by the
/// given functions.
pub fn collect_unique_with<T, R, C, V, M, I, FR, FC, FV>(
    iter: I,
    mut row_fn: FR,
    mut column_fn: FC,
    mut value_fn: FV,
) -> Result<DualKeyMap<R, C, V, M>>
where
    R: Hash + Eq + Debug,
    C: Hash + Eq + Debug,
    M: IntKeyMap<Value = V>,
    I: IntoIterator<Item = T>,
    FR: FnMut(&T) -> R,
    FC: FnMut(&T) -> C,
    FV: FnMut(T) -> V,
{
    collect_unique(iter.into_iter().map(|item| {
        let row = row_fn(&item);
        let column = column_fn(&item);
        (row, column, value_fn(item))
    }))
}

/// [`collect_merging`] over arbitrary items.
pub fn collect_merging_with<T, R, C, V, M, I, FR, FC, FV, F>(
    iter: I,
    mut row_fn: FR,
    mut column_fn: FC,
    mut value_fn: FV,
    merge: F,
) -> Result<DualKeyMap<R, C, V, M>>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V>,
    I: IntoIterator<Item = T>,
    FR: FnMut(&T) -> R,
    FC: FnMut(&T) -> C,
    FV: FnMut(T) -> V,
    F: FnMut(&V, V) -> V,
{
    collect_merging(
        iter.into_iter().map(|item| {
            let row = row_fn(&item);
            let column = column_fn(&item);
            (row, column, value_fn(item))
        }),
        merge,
    )
}

/// Collects the `(row, column)` keys of arbitrary items into a [`DualKeySet`].
pub fn collect_set<T, R, C, I, FR, FC>(
    iter: I,
    mut row_fn: FR,
    mut column_fn: FC,
) -> Result<DualKeySet<R, C>>
where
    R: Hash + Eq,
    C: Hash + Eq,
    I: IntoIterator<Item = T>,
    FR: FnMut(&T) -> R,
    FC: FnMut(&T) -> C,
{
    let mut set = DualKeySet::new();
    for item in iter {
        set.insert(row_fn(&item), column_fn(&item))?;
    }
    Ok(set)
}
