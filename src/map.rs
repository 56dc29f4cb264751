//! Map keyed by a `(row, column)` pair.

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use hashbrown::hash_map;
use hashbrown::HashMap;
use tracing::trace;

use crate::column_index::ColumnIndex;
use crate::int_map::IntKeyMap;
use crate::set::DualKeySet;
use crate::{ArrayIntMap, Config, DualKey, RadixTrie, Result};

/// A map from `(row, column)` to `V`.
///
/// Rows live in a hash table, each holding an [`IntKeyMap`] `M` of its cells. Column keys are
/// interned once in a shared [`ColumnIndex`]; a row stores only the column's integer index.
///
/// `M` picks the per-row layout. The default [`RadixTrie`] stays small for sparse rows;
/// [`ArrayIntMap`] (see [`DenseDualKeyMap`]) is faster once rows are nearly full.
///
/// Rows are visited in hash order. Within a row, cells come in ascending column-index order,
/// which is the order columns were first seen rather than their natural order.
#[derive(Clone)]
pub struct DualKeyMap<R, C, V, M = RadixTrie<V>> {
    rows: HashMap<R, M>,
    columns: ColumnIndex<C>,
    len: usize,
    _marker: PhantomData<V>,
}

/// A [`DualKeyMap`] whose rows are flat arrays indexed by column.
pub type DenseDualKeyMap<R, C, V> = DualKeyMap<R, C, V, ArrayIntMap<V>>;

impl<R, C, V, M> DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V>,
{
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            rows: HashMap::with_capacity(config.row_capacity),
            columns: ColumnIndex::with_capacity(config.column_capacity),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Copies `other` into a map with a different row layout.
    pub fn from_map<N>(other: &DualKeyMap<R, C, V, N>) -> Result<Self>
    where
        N: IntKeyMap<Value = V>,
        R: Clone,
        C: Clone,
        V: Clone,
    {
        let mut map = Self::with_config(Config {
            row_capacity: other.row_count(),
            column_capacity: other.column_count(),
        });
        map.extend_from(other)?;
        Ok(map)
    }

    /// Number of `(row, column)` pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of rows with at least one cell.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns with at least one cell.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The column interning table shared by every row.
    pub fn columns(&self) -> &ColumnIndex<C> {
        &self.columns
    }

    /// Stores `value` at `(row, column)`, returning the value it replaced.
    pub fn insert(&mut self, row: R, column: C, value: V) -> Result<Option<V>> {
        let (_, _, previous) = self.store(row, column, value)?;
        Ok(previous)
    }

    /// Stores a value and hands back the row holding it together with its column index.
    fn store(&mut self, row: R, column: C, value: V) -> Result<(&mut M, i32, Option<V>)> {
        let index = self.columns.intern(column)?;
        if let Err(err) = M::check_key(index) {
            self.columns.discard_unused(index);
            return Err(err);
        }

        let cells = self.rows.entry(row).or_insert_with(|| {
            trace!(column = index, "row created");
            M::default()
        });
        let previous = cells.insert(index, value)?;
        if previous.is_none() {
            self.len += 1;
            self.columns.acquire(index);
        }
        Ok((cells, index, previous))
    }

    pub fn get<QR, QC>(&self, row: &QR, column: &QC) -> Option<&V>
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        let index = self.columns.index_of(column)?;
        self.rows.get(row)?.get(index)
    }

    pub fn get_mut<QR, QC>(&mut self, row: &QR, column: &QC) -> Option<&mut V>
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        let index = self.columns.index_of(column)?;
        self.rows.get_mut(row)?.get_mut(index)
    }

    #[inline]
    pub fn contains_key<QR, QC>(&self, row: &QR, column: &QC) -> bool
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        self.get(row, column).is_some()
    }

    /// Removes `(row, column)`. A row left without cells is dropped, and so is a column no
    /// row uses any more.
    pub fn remove<QR, QC>(&mut self, row: &QR, column: &QC) -> Option<V>
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        let index = self.columns.index_of(column)?;
        let cells = self.rows.get_mut(row)?;
        let removed = cells.remove(index)?;
        if cells.is_empty() {
            self.rows.remove(row);
            trace!(column = index, "row reclaimed");
        }
        self.columns.release(index);
        self.len -= 1;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.columns.clear();
        self.len = 0;
    }

    pub fn contains_row<QR>(&self, row: &QR) -> bool
    where
        R: Borrow<QR>,
        QR: Hash + Eq + ?Sized,
    {
        self.rows.get(row).is_some_and(|cells| !cells.is_empty())
    }

    pub fn contains_column<QC>(&self, column: &QC) -> bool
    where
        C: Borrow<QC>,
        QC: Hash + Eq + ?Sized,
    {
        self.columns.contains(column)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Every `(row, column, value)` triple.
    pub fn iter(&self) -> Iter<'_, R, C, M> {
        Iter {
            rows: self.rows.iter(),
            current: None,
            columns: &self.columns,
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = DualKey<&R, &C>> + '_ {
        self.iter().map(|(row, column, _)| DualKey::new(row, column))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.rows
            .values()
            .flat_map(|cells| cells.iter().map(|(_, value)| value))
    }

    /// Rows holding at least one cell.
    pub fn row_keys(&self) -> hash_map::Keys<'_, R, M> {
        self.rows.keys()
    }

    /// Columns used by at least one row, in index order.
    pub fn column_keys(&self) -> crate::column_index::Keys<'_, C> {
        self.columns.keys()
    }

    /// Cells of one row in ascending column-index order.
    pub fn row<QR>(&self, row: &QR) -> impl Iterator<Item = (&C, &V)> + '_
    where
        R: Borrow<QR>,
        QR: Hash + Eq + ?Sized,
    {
        let columns = &self.columns;
        self.rows.get(row).into_iter().flat_map(move |cells| {
            cells
                .iter()
                .filter_map(move |(index, value)| Some((columns.resolve(index)?, value)))
        })
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&R, &C, &V),
    {
        for (row, column, value) in self.iter() {
            f(row, column, value);
        }
    }

    /// Presence-only copy of the keys.
    pub fn to_set(&self) -> Result<DualKeySet<R, C>>
    where
        R: Clone,
        C: Clone,
    {
        let mut set = DualKeySet::with_config(Config {
            row_capacity: self.row_count(),
            column_capacity: self.column_count(),
        });
        for (row, column, _) in self.iter() {
            set.insert(row.clone(), column.clone())?;
        }
        Ok(set)
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.rows.capacity() * (std::mem::size_of::<(R, M)>() + 1)
            + self
                .rows
                .values()
                .map(|cells| cells.memory_usage().saturating_sub(std::mem::size_of::<M>()))
                .sum::<usize>()
            + self.columns.memory_usage()
    }

    /// Panics if the row tables and the column index disagree.
    #[cfg(test)]
    pub(crate) fn validate(&self) {
        let mut refs: HashMap<i32, u32> = HashMap::new();
        let mut total = 0;
        for cells in self.rows.values() {
            assert!(!cells.is_empty(), "empty row must be reclaimed");
            total += cells.len();
            for (index, _) in cells.iter() {
                assert!(
                    self.columns.resolve(index).is_some(),
                    "row refers to freed column {index}"
                );
                *refs.entry(index).or_default() += 1;
            }
        }
        assert_eq!(total, self.len, "len must equal the sum of row sizes");
        assert_eq!(refs.len(), self.columns.len(), "unused column left live");
        for (index, count) in refs {
            assert_eq!(self.columns.refs(index), count, "column {index} refcount");
        }
    }

    // =========================================================================
    // Convenience operations built on the primitives above
    // =========================================================================

    /// The value at `(row, column)`, or `default` when absent.
    pub fn get_or_default<'a, QR, QC>(&'a self, row: &QR, column: &QC, default: &'a V) -> &'a V
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        self.get(row, column).unwrap_or(default)
    }

    /// Stores `value` only when `(row, column)` is vacant. Returns the value already present,
    /// if any.
    pub fn insert_if_absent(&mut self, row: R, column: C, value: V) -> Result<Option<&V>> {
        if self.contains_key(&row, &column) {
            return Ok(self.get(&row, &column));
        }
        self.store(row, column, value)?;
        Ok(None)
    }

    /// Removes `(row, column)` only when it currently maps to `value`.
    pub fn remove_if_eq<QR, QC>(&mut self, row: &QR, column: &QC, value: &V) -> bool
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        if self.get(row, column) != Some(value) {
            return false;
        }
        self.remove(row, column).is_some()
    }

    /// Overwrites the value at `(row, column)` only when one is present.
    pub fn replace<QR, QC>(&mut self, row: &QR, column: &QC, value: V) -> Option<V>
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        self.get_mut(row, column)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Overwrites the value at `(row, column)` only when it equals `current`.
    pub fn replace_if_eq<QR, QC>(&mut self, row: &QR, column: &QC, current: &V, value: V) -> bool
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        match self.get_mut(row, column) {
            Some(slot) if *slot == *current => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Computes and stores a value when `(row, column)` is vacant. `f` returning `None`
    /// leaves the map untouched.
    pub fn compute_if_absent<F>(&mut self, row: R, column: C, f: F) -> Result<Option<&V>>
    where
        F: FnOnce(&R, &C) -> Option<V>,
    {
        if self.contains_key(&row, &column) {
            return Ok(self.get(&row, &column));
        }
        let Some(value) = f(&row, &column) else {
            return Ok(None);
        };
        let (cells, index, _) = self.store(row, column, value)?;
        let cells: &M = cells;
        Ok(cells.get(index))
    }

    /// Recomputes a present value; `f` returning `None` removes the entry.
    pub fn compute_if_present<QR, QC, F>(&mut self, row: &QR, column: &QC, f: F) -> Option<&V>
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> Option<V>,
    {
        match f(self.get(row, column)?) {
            Some(value) => {
                let slot = self.get_mut(row, column)?;
                *slot = value;
                Some(&*slot)
            }
            None => {
                self.remove(row, column);
                None
            }
        }
    }

    /// Replaces the entry with whatever `f` returns given the current value; `None` removes it.
    pub fn compute<F>(&mut self, row: R, column: C, f: F) -> Result<Option<&V>>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let next = f(self.get(&row, &column));
        match next {
            Some(value) => {
                let (cells, index, _) = self.store(row, column, value)?;
                let cells: &M = cells;
                Ok(cells.get(index))
            }
            None => {
                self.remove(&row, &column);
                Ok(None)
            }
        }
    }

    /// Stores `value` when vacant, otherwise combines it with the present value through `f`.
    /// `f` returning `None` removes the entry.
    pub fn merge<F>(&mut self, row: R, column: C, value: V, f: F) -> Result<Option<&V>>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        self.compute(row, column, |current| match current {
            Some(current) => f(current, value),
            None => Some(value),
        })
    }

    /// Copies every entry of `other` into `self`, overwriting shared pairs.
    pub fn extend_from<N>(&mut self, other: &DualKeyMap<R, C, V, N>) -> Result<()>
    where
        N: IntKeyMap<Value = V>,
        R: Clone,
        C: Clone,
        V: Clone,
    {
        for (row, column, value) in other.iter() {
            self.store(row.clone(), column.clone(), value.clone())?;
        }
        Ok(())
    }
}

impl<R, C, V, M> Default for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C, V, M, N> PartialEq<DualKeyMap<R, C, V, N>> for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    V: PartialEq,
    M: IntKeyMap<Value = V>,
    N: IntKeyMap<Value = V>,
{
    fn eq(&self, other: &DualKeyMap<R, C, V, N>) -> bool {
        self.len == other.len
            && self
                .iter()
                .all(|(row, column, value)| other.get(row, column) == Some(value))
    }
}

impl<R, C, V, M> Eq for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    V: Eq,
    M: IntKeyMap<Value = V>,
{
}

/// Order independent, so maps that compare equal hash equally whatever their row layout.
impl<R, C, V, M> Hash for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    V: Hash,
    M: IntKeyMap<Value = V>,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sum = 0u64;
        for entry in self.iter() {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            sum = sum.wrapping_add(hasher.finish());
        }
        state.write_usize(self.len);
        state.write_u64(sum);
    }
}

impl<R, C, V, M> fmt::Debug for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq + fmt::Debug,
    C: Hash + Eq + fmt::Debug,
    V: fmt::Debug,
    M: IntKeyMap<Value = V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(row, column, value)| ((row, column), value)))
            .finish()
    }
}

/// Renders `{[row, column]=value, ...}` in iteration order.
impl<R, C, V, M> fmt::Display for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq + fmt::Display,
    C: Hash + Eq + fmt::Display,
    V: fmt::Display,
    M: IntKeyMap<Value = V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (row, column, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{row}, {column}]={value}")?;
        }
        f.write_str("}")
    }
}

/// Inserts every triple, later values overwriting earlier ones.
///
/// # Panics
///
/// If a row layout rejects a column index, which for [`ArrayIntMap`] rows only happens past
/// roughly two billion distinct columns. Use [`collect`](crate::collect) to get the error.
impl<R, C, V, M> Extend<(R, C, V)> for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V>,
{
    fn extend<I: IntoIterator<Item = (R, C, V)>>(&mut self, iter: I) {
        for (row, column, value) in iter {
            if let Err(err) = self.store(row, column, value) {
                panic!("cannot extend dual-key map: {err}");
            }
        }
    }
}

impl<R, C, V, M> FromIterator<(R, C, V)> for DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V>,
{
    fn from_iter<I: IntoIterator<Item = (R, C, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, R, C, V, M> IntoIterator for &'a DualKeyMap<R, C, V, M>
where
    R: Hash + Eq,
    C: Hash + Eq,
    M: IntKeyMap<Value = V> + 'a,
{
    type Item = (&'a R, &'a C, &'a V);
    type IntoIter = Iter<'a, R, C, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the `(row, column, value)` triples of a [`DualKeyMap`].
pub struct Iter<'a, R, C, M: IntKeyMap + 'a> {
    rows: hash_map::Iter<'a, R, M>,
    current: Option<(&'a R, M::Iter<'a>)>,
    columns: &'a ColumnIndex<C>,
    remaining: usize,
}

impl<'a, R, C, M: IntKeyMap + 'a> Iterator for Iter<'a, R, C, M> {
    type Item = (&'a R, &'a C, &'a M::Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((row, cells)) = &mut self.current {
                if let Some((index, value)) = cells.next() {
                    let Some(column) = self.columns.resolve(index) else {
                        debug_assert!(false, "row refers to freed column {index}");
                        continue;
                    };
                    self.remaining -= 1;
                    return Some((*row, column, value));
                }
            }
            let (row, cells) = self.rows.next()?;
            self.current = Some((row, cells.iter()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, R, C, M: IntKeyMap + 'a> ExactSizeIterator for Iter<'a, R, C, M> {}
