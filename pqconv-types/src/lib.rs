//! Data model shared by every pqconv crate.
//!
//! - [`LogicalKind`]: leaf type of a column (`int32`, `decimal(38,18)`, ...).
//! - [`ValueKind`]: leaf kind plus nullable/array wrapping, as declared by a
//!   record field.
//! - [`ColumnDescriptor`] / [`ColumnSchema`]: the canonical on-disk shape of a
//!   record type, convertible to and from an Arrow schema.
//! - [`ColumnValue`]: one cell in canonical form.
//! - [`DecimalValue`]: native decimal with Decimal128 semantics.

pub mod decimal;
pub mod kind;
pub mod schema;
pub mod value;

pub use decimal::{DecimalError, DecimalValue, MAX_DECIMAL_PRECISION};
pub use kind::{
    DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE, DEFAULT_TIMESTAMP_UNIT, LogicalKind,
    TIMESTAMP_TZ, ValueKind,
};
pub use schema::{ColumnDescriptor, ColumnSchema};
pub use value::ColumnValue;

pub use arrow::datatypes::TimeUnit;
