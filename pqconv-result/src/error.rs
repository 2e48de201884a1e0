use std::fmt;
use thiserror::Error;

/// Unified error type for all pqconv operations.
///
/// The four semantic variants ([`Error::Schema`], [`Error::SchemaMismatch`],
/// [`Error::Coercion`] and [`Error::IndexOutOfRange`]) are fail-fast: they
/// describe a problem with the request itself and retrying the same call
/// yields the same error. The remaining variants wrap failures from the
/// storage and format layers.
///
/// `Error` is `Send + Sync` so it can cross thread boundaries when callers run
/// independent conversions concurrently.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow library error while building or slicing column arrays.
    ///
    /// Typically indicates an internal inconsistency between the column
    /// schema and the arrays built for it (length or type disagreement).
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet library error while encoding or decoding a row group blob.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// A value kind, field marker, or stored column type cannot be classified
    /// into a column descriptor.
    ///
    /// Raised during schema derivation. Nothing is cached for a type whose
    /// reflection fails.
    #[error("schema error: {0}")]
    Schema(String),

    /// An append was requested against a destination whose schema differs
    /// from the schema of the records being written, or that holds no
    /// container.
    ///
    /// Raised before any row group is written; the destination is unchanged.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A single value failed conversion between its native and column form.
    ///
    /// Covers decimal scale or precision overflow, nulls written into or read
    /// from non-nullable columns, and stored columns whose type does not match
    /// the target descriptor. Aborts the containing row group.
    #[error("cannot coerce column '{column}': {reason}")]
    Coercion { column: String, reason: String },

    /// A row group index is negative or not below the stored row group count.
    #[error("row group index {index} is out of range (container holds {count} row groups)")]
    IndexOutOfRange { index: i64, count: usize },

    /// Invalid API parameter, such as a zero row group size.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Container or blob not found.
    #[error("Storage key not found")]
    NotFound,

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a [`Error::Schema`] from any displayable message.
    #[inline]
    pub fn schema<E: fmt::Display>(err: E) -> Self {
        Error::Schema(err.to_string())
    }

    /// Create a [`Error::Coercion`] for `column`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pqconv_result::Error;
    ///
    /// let err = Error::coercion("Price", "scale 4 exceeds column scale 2");
    /// assert!(matches!(err, Error::Coercion { ref column, .. } if column == "Price"));
    /// ```
    #[inline]
    pub fn coercion(column: impl Into<String>, reason: impl fmt::Display) -> Self {
        Error::Coercion {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the column a [`Error::Coercion`] refers to.
    pub fn column(&self) -> Option<&str> {
        match self {
            Error::Coercion { column, .. } => Some(column),
            _ => None,
        }
    }

    /// Whether this is an [`Error::IndexOutOfRange`] for `index`.
    pub fn is_index_out_of_range(&self, index: i64) -> bool {
        matches!(self, Error::IndexOutOfRange { index: i, .. } if *i == index)
    }
}
