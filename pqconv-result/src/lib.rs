//! Error types and result definitions for the pqconv crates.
//!
//! Every pqconv crate reports failures through the single [`Error`] enum and
//! the [`Result<T>`] alias, so errors cross crate boundaries with `?` and can
//! be matched structurally by callers.
//!
//! # Error Categories
//!
//! - **Schema derivation** ([`Error::Schema`]): a record type, a field marker,
//!   or a stored schema cannot be mapped onto the column type system.
//! - **Append compatibility** ([`Error::SchemaMismatch`]): the destination of
//!   an append holds a different column schema, or no container at all.
//! - **Value coercion** ([`Error::Coercion`]): a single value cannot be
//!   converted between its native and column forms. Always names the column.
//! - **Row-group addressing** ([`Error::IndexOutOfRange`]): a requested row
//!   group does not exist. Carries the requested index.
//! - **Format errors** ([`Error::Arrow`], [`Error::Parquet`]): failures raised
//!   by the Arrow and Parquet libraries while encoding or decoding row groups.
//! - **Lookup failures** ([`Error::NotFound`]) and **internal errors**
//!   ([`Error::Internal`]).
//!
//! None of these errors are retried internally.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
