//! Set of `(row, column)` pairs.
//!
//! Same layout as [`DualKeyMap`](crate::DualKeyMap) with the per-row map replaced by a bit
//! vector over column indices. The first 64 columns of a row live inline in the row entry.

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use hashbrown::hash_map;
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::column_index::ColumnIndex;
use crate::{Config, DualKey, Result};

const WORD_BITS: usize = 64;

// =============================================================================
// Per-row bit vector
// =============================================================================

/// Column membership of one row. Trailing zero words are never kept, so an empty row has no
/// words at all.
#[derive(Clone, Default)]
struct BitRow {
    words: SmallVec<[u64; 1]>,
}

impl BitRow {
    #[inline]
    fn locate(index: i32) -> (usize, u64) {
        let idx = index as usize;
        (idx / WORD_BITS, 1u64 << (idx % WORD_BITS))
    }

    fn contains(&self, index: i32) -> bool {
        if index < 0 {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Sets the bit for `index`; returns whether it was clear before.
    fn insert(&mut self, index: i32) -> bool {
        debug_assert!(index >= 0);
        let (word, mask) = Self::locate(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let w = &mut self.words[word];
        if *w & mask != 0 {
            return false;
        }
        *w |= mask;
        true
    }

    /// Clears the bit for `index`; returns whether it was set.
    fn remove(&mut self, index: i32) -> bool {
        if index < 0 {
            return false;
        }
        let (word, mask) = Self::locate(index);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => *w &= !mask,
            _ => return false,
        }
        let before = self.words.len();
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
        if self.words.len() < before {
            self.words.shrink_to_fit();
        }
        true
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            next_word: 0,
            base: 0,
            current: 0,
        }
    }

    fn heap_bytes(&self) -> usize {
        if self.words.spilled() {
            self.words.capacity() * std::mem::size_of::<u64>()
        } else {
            0
        }
    }
}

/// Set bit positions of a [`BitRow`], ascending.
struct Ones<'a> {
    words: &'a [u64],
    next_word: usize,
    base: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some((self.base + bit) as i32);
            }
            let word = *self.words.get(self.next_word)?;
            self.base = self.next_word * WORD_BITS;
            self.current = word;
            self.next_word += 1;
        }
    }
}

// =============================================================================
// DualKeySet
// =============================================================================

/// A set of `(row, column)` pairs.
///
/// Rows are visited in hash order, columns within a row in ascending column-index order.
#[derive(Clone)]
pub struct DualKeySet<R, C> {
    rows: HashMap<R, BitRow>,
    columns: ColumnIndex<C>,
    len: usize,
}

impl<R, C> DualKeySet<R, C>
where
    R: Hash + Eq,
    C: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            rows: HashMap::with_capacity(config.row_capacity),
            columns: ColumnIndex::with_capacity(config.column_capacity),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &ColumnIndex<C> {
        &self.columns
    }

    /// Adds `(row, column)`; returns `false` if it was already present.
    pub fn insert(&mut self, row: R, column: C) -> Result<bool> {
        let index = self.columns.intern(column)?;
        let bits = self.rows.entry(row).or_insert_with(|| {
            trace!(column = index, "set row created");
            BitRow::default()
        });
        if !bits.insert(index) {
            return Ok(false);
        }
        self.len += 1;
        self.columns.acquire(index);
        Ok(true)
    }

    pub fn contains<QR, QC>(&self, row: &QR, column: &QC) -> bool
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        let Some(index) = self.columns.index_of(column) else {
            return false;
        };
        self.rows.get(row).is_some_and(|bits| bits.contains(index))
    }

    /// Removes `(row, column)`; returns whether it was present.
    pub fn remove<QR, QC>(&mut self, row: &QR, column: &QC) -> bool
    where
        R: Borrow<QR>,
        C: Borrow<QC>,
        QR: Hash + Eq + ?Sized,
        QC: Hash + Eq + ?Sized,
    {
        let Some(index) = self.columns.index_of(column) else {
            return false;
        };
        let Some(bits) = self.rows.get_mut(row) else {
            return false;
        };
        if !bits.remove(index) {
            return false;
        }
        if bits.is_empty() {
            self.rows.remove(row);
            trace!(column = index, "set row reclaimed");
        }
        self.columns.release(index);
        self.len -= 1;
        true
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
        self.rows.get(row).is_some_and(|bits| !bits.is_empty())
    }

    pub fn contains_column<QC>(&self, column: &QC) -> bool
    where
        C: Borrow<QC>,
        QC: Hash + Eq + ?Sized,
    {
        self.columns.contains(column)
    }

    pub fn row_keys(&self) -> impl ExactSizeIterator<Item = &R> + '_ {
        self.rows.keys()
    }

    pub fn column_keys(&self) -> crate::column_index::Keys<'_, C> {
        self.columns.keys()
    }

    /// Number of columns present in `row`.
    pub fn row_len<QR>(&self, row: &QR) -> usize
    where
        R: Borrow<QR>,
        QR: Hash + Eq + ?Sized,
    {
        self.rows.get(row).map_or(0, BitRow::len)
    }

    /// Columns of one row in ascending column-index order.
    pub fn row<QR>(&self, row: &QR) -> impl Iterator<Item = &C> + '_
    where
        R: Borrow<QR>,
        QR: Hash + Eq + ?Sized,
    {
        let columns = &self.columns;
        self.rows
            .get(row)
            .into_iter()
            .flat_map(move |bits| bits.ones().filter_map(move |index| columns.resolve(index)))
    }

    pub fn iter(&self) -> Iter<'_, R, C> {
        Iter {
            rows: self.rows.iter(),
            current: None,
            columns: &self.columns,
            remaining: self.len,
        }
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&R, &C),
    {
        for (row, column) in self.iter() {
            f(row, column);
        }
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.rows.capacity() * (std::mem::size_of::<(R, BitRow)>() + 1)
            + self.rows.values().map(BitRow::heap_bytes).sum::<usize>()
            + self.columns.memory_usage()
    }
}

impl<R: Hash + Eq, C: Hash + Eq> Default for DualKeySet<R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Hash + Eq, C: Hash + Eq> PartialEq for DualKeySet<R, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(row, column)| other.contains(row, column))
    }
}

impl<R: Hash + Eq, C: Hash + Eq> Eq for DualKeySet<R, C> {}

impl<R: Hash + Eq, C: Hash + Eq> Hash for DualKeySet<R, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sum = 0u64;
        for pair in self.iter() {
            let mut hasher = DefaultHasher::new();
            pair.hash(&mut hasher);
            sum = sum.wrapping_add(hasher.finish());
        }
        state.write_usize(self.len);
        state.write_u64(sum);
    }
}

impl<R, C> fmt::Debug for DualKeySet<R, C>
where
    R: Hash + Eq + fmt::Debug,
    C: Hash + Eq + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Renders `{[row, column], ...}` in iteration order.
impl<R, C> fmt::Display for DualKeySet<R, C>
where
    R: Hash + Eq + fmt::Display,
    C: Hash + Eq + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (row, column)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{row}, {column}]")?;
        }
        f.write_str("}")
    }
}

/// # Panics
///
/// If the column index space is exhausted; see [`DualKeySet::insert`] for the fallible form.
impl<R: Hash + Eq, C: Hash + Eq> Extend<(R, C)> for DualKeySet<R, C> {
    fn extend<I: IntoIterator<Item = (R, C)>>(&mut self, iter: I) {
        for (row, column) in iter {
            if let Err(err) = self.insert(row, column) {
                panic!("cannot extend dual-key set: {err}");
            }
        }
    }
}

impl<R: Hash + Eq, C: Hash + Eq> Extend<DualKey<R, C>> for DualKeySet<R, C> {
    fn extend<I: IntoIterator<Item = DualKey<R, C>>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(DualKey::into_parts));
    }
}

impl<R: Hash + Eq, C: Hash + Eq> FromIterator<(R, C)> for DualKeySet<R, C> {
    fn from_iter<I: IntoIterator<Item = (R, C)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<R: Hash + Eq, C: Hash + Eq> FromIterator<DualKey<R, C>> for DualKeySet<R, C> {
    fn from_iter<I: IntoIterator<Item = DualKey<R, C>>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, R: Hash + Eq, C: Hash + Eq> IntoIterator for &'a DualKeySet<R, C> {
    type Item = (&'a R, &'a C);
    type IntoIter = Iter<'a, R, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the `(row, column)` pairs of a [`DualKeySet`].
pub struct Iter<'a, R, C> {
    rows: hash_map::Iter<'a, R, BitRow>,
    current: Option<(&'a R, Ones<'a>)>,
    columns: &'a ColumnIndex<C>,
    remaining: usize,
}

impl<'a, R, C> Iterator for Iter<'a, R, C> {
    type Item = (&'a R, &'a C);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((row, ones)) = &mut self.current {
                if let Some(index) = ones.next() {
                    let Some(column) = self.columns.resolve(index) else {
                        debug_assert!(false, "set row refers to freed column {index}");
                        continue;
                    };
                    self.remaining -= 1;
                    return Some((*row, column));
                }
            }
            let (row, bits) = self.rows.next()?;
            self.current = Some((row, bits.ones()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R, C> ExactSizeIterator for Iter<'_, R, C> {}
