//! Canonical column values.

use bytes::Bytes;

use crate::decimal::DecimalValue;

/// A single cell in its canonical column form.
///
/// This is the meeting point of the coercion layer: native field values are
/// turned into `ColumnValue`s on write and built back from them on read.
/// The column descriptor decides how each variant is laid out in Arrow.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Bytes),
    Decimal(DecimalValue),
    /// Nanoseconds since the Unix epoch, UTC. Narrowed to the column unit on
    /// write.
    Timestamp(i128),
    /// Days since the Unix epoch.
    Date(i32),
    List(Vec<ColumnValue>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Short variant name used in coercion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Null => "null",
            ColumnValue::Bool(_) => "bool",
            ColumnValue::Int16(_) => "int16",
            ColumnValue::Int32(_) => "int32",
            ColumnValue::Int64(_) => "int64",
            ColumnValue::Float(_) => "float",
            ColumnValue::Double(_) => "double",
            ColumnValue::String(_) => "string",
            ColumnValue::Binary(_) => "binary",
            ColumnValue::Decimal(_) => "decimal",
            ColumnValue::Timestamp(_) => "timestamp",
            ColumnValue::Date(_) => "date",
            ColumnValue::List(_) => "list",
        }
    }
}
