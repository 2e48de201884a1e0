//! Logical column kinds and the value shapes reported by record fields.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, TimeUnit};

use crate::decimal::MAX_DECIMAL_PRECISION;

/// Timezone recorded on every timestamp column written by pqconv.
pub const TIMESTAMP_TZ: &str = "UTC";

/// Precision used for decimal fields without an explicit marker.
pub const DEFAULT_DECIMAL_PRECISION: u8 = 38;

/// Scale used for decimal fields without an explicit marker.
pub const DEFAULT_DECIMAL_SCALE: i8 = 18;

/// Unit used for timestamp fields without an explicit marker.
pub const DEFAULT_TIMESTAMP_UNIT: TimeUnit = TimeUnit::Millisecond;

/// Leaf type of a column, independent of nullability and repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKind {
    Bool,
    Int16,
    Int32,
    Int64,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// UTF-8 text.
    String,
    Binary,
    Decimal {
        precision: u8,
        scale: i8,
    },
    /// Instant since the Unix epoch, stored in `unit` and adjusted to UTC.
    Timestamp(TimeUnit),
    /// Days since the Unix epoch.
    Date,
}

impl LogicalKind {
    /// Decimal kind with the default precision and scale.
    pub const fn default_decimal() -> Self {
        LogicalKind::Decimal {
            precision: DEFAULT_DECIMAL_PRECISION,
            scale: DEFAULT_DECIMAL_SCALE,
        }
    }

    /// Timestamp kind with the default unit.
    pub const fn default_timestamp() -> Self {
        LogicalKind::Timestamp(DEFAULT_TIMESTAMP_UNIT)
    }

    /// Arrow type of a single (non-repeated) value of this kind.
    pub fn arrow_type(&self) -> DataType {
        match *self {
            LogicalKind::Bool => DataType::Boolean,
            LogicalKind::Int16 => DataType::Int16,
            LogicalKind::Int32 => DataType::Int32,
            LogicalKind::Int64 => DataType::Int64,
            LogicalKind::Float => DataType::Float32,
            LogicalKind::Double => DataType::Float64,
            LogicalKind::String => DataType::Utf8,
            LogicalKind::Binary => DataType::Binary,
            LogicalKind::Decimal { precision, scale } => DataType::Decimal128(precision, scale),
            LogicalKind::Timestamp(unit) => DataType::Timestamp(unit, Some(TIMESTAMP_TZ.into())),
            LogicalKind::Date => DataType::Date32,
        }
    }

    /// Classify an Arrow leaf type, `None` for types pqconv does not map.
    ///
    /// Timestamps are accepted with any timezone annotation; the stored
    /// instant is interpreted as UTC either way.
    pub fn from_arrow(data_type: &DataType) -> Option<Self> {
        Some(match data_type {
            DataType::Boolean => LogicalKind::Bool,
            DataType::Int16 => LogicalKind::Int16,
            DataType::Int32 => LogicalKind::Int32,
            DataType::Int64 => LogicalKind::Int64,
            DataType::Float32 => LogicalKind::Float,
            DataType::Float64 => LogicalKind::Double,
            DataType::Utf8 => LogicalKind::String,
            DataType::Binary => LogicalKind::Binary,
            DataType::Decimal128(precision, scale) => LogicalKind::Decimal {
                precision: *precision,
                scale: *scale,
            },
            DataType::Timestamp(unit, _) => LogicalKind::Timestamp(*unit),
            DataType::Date32 => LogicalKind::Date,
            _ => return None,
        })
    }

    /// Same kind up to decimal precision/scale and timestamp unit.
    ///
    /// Values of one family can be read into a native slot of another member
    /// of the same family without changing their meaning.
    pub fn same_family(&self, other: &LogicalKind) -> bool {
        match (self, other) {
            (LogicalKind::Decimal { .. }, LogicalKind::Decimal { .. }) => true,
            (LogicalKind::Timestamp(_), LogicalKind::Timestamp(_)) => true,
            (a, b) => a == b,
        }
    }

    /// Validate parameters that come from field markers.
    pub fn validate(&self) -> Result<(), String> {
        if let LogicalKind::Decimal { precision, scale } = *self {
            if precision == 0 || precision > MAX_DECIMAL_PRECISION {
                return Err(format!(
                    "decimal precision {precision} outside 1..={MAX_DECIMAL_PRECISION}"
                ));
            }
            if scale < 0 || scale as u8 > precision {
                return Err(format!(
                    "decimal scale {scale} outside 0..={precision} for precision {precision}"
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for LogicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalKind::Bool => f.write_str("bool"),
            LogicalKind::Int16 => f.write_str("int16"),
            LogicalKind::Int32 => f.write_str("int32"),
            LogicalKind::Int64 => f.write_str("int64"),
            LogicalKind::Float => f.write_str("float"),
            LogicalKind::Double => f.write_str("double"),
            LogicalKind::String => f.write_str("string"),
            LogicalKind::Binary => f.write_str("binary"),
            LogicalKind::Decimal { precision, scale } => {
                write!(f, "decimal({precision},{scale})")
            }
            LogicalKind::Timestamp(unit) => write!(f, "timestamp({unit:?})"),
            LogicalKind::Date => f.write_str("date"),
        }
    }
}

/// Declared shape of a record field: leaf kind plus optional/array wrapping.
///
/// `nullable` always describes the leaf values (`Option<T>` or
/// `Vec<Option<T>>`). For repeated values `list_nullable` says whether the
/// list slot itself may be absent (`Option<Vec<T>>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueKind {
    pub kind: LogicalKind,
    pub nullable: bool,
    pub repeated: bool,
    pub list_nullable: bool,
}

impl ValueKind {
    pub const fn required(kind: LogicalKind) -> Self {
        Self {
            kind,
            nullable: false,
            repeated: false,
            list_nullable: false,
        }
    }

    pub const fn optional(kind: LogicalKind) -> Self {
        Self {
            kind,
            nullable: true,
            repeated: false,
            list_nullable: false,
        }
    }

    /// Wrap a scalar shape into a list whose slot is always present.
    pub const fn list_of(element: ValueKind) -> Self {
        Self {
            kind: element.kind,
            nullable: element.nullable,
            repeated: true,
            list_nullable: false,
        }
    }

    /// Mark the list slot of a repeated shape as optional.
    pub const fn with_list_nullable(mut self) -> Self {
        self.list_nullable = true;
        self
    }

    /// Same shape with a different leaf kind (used by field markers).
    pub const fn with_kind(mut self, kind: LogicalKind) -> Self {
        self.kind = kind;
        self
    }

    /// Arrow field for a column of this shape named `name`.
    pub fn arrow_field(&self, name: &str) -> Field {
        let leaf = self.kind.arrow_type();
        if self.repeated {
            let item = Field::new_list_field(leaf, self.nullable);
            Field::new(name, DataType::List(Arc::new(item)), self.list_nullable)
        } else {
            Field::new(name, leaf, self.nullable)
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaf = if self.nullable {
            format!("{}?", self.kind)
        } else {
            self.kind.to_string()
        };
        match (self.repeated, self.list_nullable) {
            (false, _) => f.write_str(&leaf),
            (true, false) => write!(f, "[{leaf}]"),
            (true, true) => write!(f, "[{leaf}]?"),
        }
    }
}
