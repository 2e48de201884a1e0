//! Reflection layer of pqconv.
//!
//! Turns a [`Record`] type into a [`ColumnSchema`](pqconv_types::ColumnSchema)
//! and moves values between record fields and Arrow column arrays:
//!
//! - [`record`]: the `Record` trait and its field walk (ignore/rename and kind
//!   markers).
//! - [`native`]: per-type value shapes and conversion to canonical
//!   [`ColumnValue`](pqconv_types::ColumnValue)s.
//! - [`reflector`]: process-wide cache of derived schemas and bound accessors.
//! - [`coerce`]: building and decoding Arrow arrays against a column
//!   descriptor.

pub mod coerce;
pub mod native;
pub mod record;
pub mod reflector;

pub use coerce::{check_compatible, decode_column, encode_column};
pub use native::{NativeScalar, NativeValue};
pub use record::{FieldAccess, FieldMarker, FieldSet, FieldSlot, Record, declared_fields, walk};
pub use reflector::{BoundField, TypeBinding, binding, cached_type_count, reflect};
