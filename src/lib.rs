//! # dualkey
//!
//! Memory-efficient maps and sets keyed by a pair of values.
//!
//! A naive `HashMap<(R, C), V>` stores and hashes both keys for every entry. Here every
//! distinct column key is interned once into a small integer shared by all rows, and each
//! row keeps its cells in an integer-keyed map:
//!
//! - [`DualKeyMap`]: row key -> [`RadixTrie`] (or [`ArrayIntMap`]) of values, plus a
//!   [`ColumnIndex`] resolving integer slots back to column keys.
//! - [`DualKeySet`]: the same layout with one presence bit per column instead of a value.
//!
//! ## Example
//!
//! ```rust
//! use dualkey::DualKeyMap;
//!
//! let mut stock: DualKeyMap<&str, &str, u32> = DualKeyMap::new();
//! stock.insert("shirt", "s1", 10).unwrap();
//! stock.insert("pants", "s2", 24).unwrap();
//!
//! assert_eq!(stock.get("shirt", "s1"), Some(&10));
//! assert_eq!(stock.get("tie", "s9"), None);
//!
//! stock.remove("shirt", "s1");
//! assert!(!stock.contains_row("shirt"));
//! assert_eq!(stock.len(), 1);
//! ```
//!
//! None of the containers synchronise internally. Share them across threads behind your own
//! lock, and do not mutate a container while iterating it.

use std::fmt;

pub mod array_map;
pub mod collect;
pub mod column_index;
mod error;
pub mod int_map;
pub mod map;
pub mod radix_trie;
pub mod set;

pub use array_map::ArrayIntMap;
pub use column_index::ColumnIndex;
pub use error::{Error, Result};
pub use int_map::IntKeyMap;
pub use map::{DenseDualKeyMap, DualKeyMap};
pub use radix_trie::RadixTrie;
pub use set::DualKeySet;

/// Construction-time sizing for [`DualKeyMap`] and [`DualKeySet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Rows to reserve room for up front.
    pub row_capacity: usize,
    /// Distinct columns to reserve room for up front.
    pub column_capacity: usize,
}

/// A `(row, column)` pair used where a single composite key value is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DualKey<R, C> {
    pub row: R,
    pub column: C,
}

impl<R, C> DualKey<R, C> {
    pub fn new(row: R, column: C) -> Self {
        Self { row, column }
    }

    pub fn into_parts(self) -> (R, C) {
        (self.row, self.column)
    }
}

impl<R, C> From<(R, C)> for DualKey<R, C> {
    fn from((row, column): (R, C)) -> Self {
        Self { row, column }
    }
}

impl<R: fmt::Display, C: fmt::Display> fmt::Display for DualKey<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.row, self.column)
    }
}


#[cfg(test)]
mod proptests;
