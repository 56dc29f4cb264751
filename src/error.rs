//! Error type shared by every container in the crate.

use thiserror::Error;

/// Errors reported by the integer-keyed maps and the dual-key builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An array-backed map was asked to hold a negative key.
    #[error("negative key {0} is not supported by an array-backed map")]
    NegativeKey(i32),

    /// Growing an array-backed map to hold `key` would exceed `max` slots.
    #[error("key {key} exceeds the maximum array capacity of {max} slots")]
    KeyOutOfRange { key: i32, max: usize },

    /// A non-merging collection saw the same `(row, column)` pair twice.
    #[error("duplicate key [{row}, {column}]")]
    DuplicateKey { row: String, column: String },
}

pub type Result<T> = std::result::Result<T, Error>;
