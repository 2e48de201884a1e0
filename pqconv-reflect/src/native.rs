//! Native side of the coercion layer.
//!
//! [`NativeValue`] is implemented for every field type a [`Record`] may
//! declare. Each implementation reports its [`ValueKind`] (leaf kind plus
//! optional/array wrapping) and converts to and from [`ColumnValue`].
//!
//! Scalars implement [`NativeScalar`]; `impl_native_shapes!` then derives
//! the five supported shapes for each of them:
//!
//! | Rust type              | nullable | repeated | list_nullable |
//! |------------------------|----------|----------|---------------|
//! | `T`                    | no       | no       | -             |
//! | `Option<T>`            | yes      | no       | -             |
//! | `Vec<T>`               | no       | yes      | no            |
//! | `Vec<Option<T>>`       | yes      | yes      | no            |
//! | `Option<Vec<T>>`       | no       | yes      | yes           |
//!
//! [`Record`]: crate::record::Record

use bytes::Bytes;
use pqconv_result::{Error, Result};
use pqconv_types::{ColumnValue, DecimalValue, LogicalKind, ValueKind};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// A field type that maps onto one column.
pub trait NativeValue: Sized + Send + Sync + 'static {
    /// Declared shape of the field.
    fn value_kind() -> ValueKind;

    /// Convert to canonical form. Never fails; range and scale checks happen
    /// against the column descriptor when the column array is built.
    fn to_column(&self) -> ColumnValue;

    /// Rebuild a native value. `column` names the source column for errors.
    fn from_column(value: ColumnValue, column: &str) -> Result<Self>;

    /// Value used for target fields that have no stored column.
    fn default_native() -> Self;
}

/// A non-null leaf value.
pub trait NativeScalar: Sized + Send + Sync + 'static {
    fn logical_kind() -> LogicalKind;

    fn to_scalar(&self) -> ColumnValue;

    /// Convert a non-null canonical value.
    fn from_scalar(value: ColumnValue, column: &str) -> Result<Self>;

    fn zero() -> Self;
}

fn mismatch(column: &str, expected: LogicalKind, got: &ColumnValue) -> Error {
    Error::coercion(
        column,
        format!("expected {expected} value, got {}", got.type_name()),
    )
}

fn unexpected_null(column: &str) -> Error {
    Error::coercion(column, "null read into non-nullable field")
}

fn list_items(value: ColumnValue, column: &str) -> Result<Vec<ColumnValue>> {
    match value {
        ColumnValue::List(items) => Ok(items),
        ColumnValue::Null => Err(unexpected_null(column)),
        other => Err(Error::coercion(
            column,
            format!("expected list value, got {}", other.type_name()),
        )),
    }
}

macro_rules! impl_simple_scalar {
    ($t:ty, $kind:expr, $variant:ident, $zero:expr) => {
        impl NativeScalar for $t {
            fn logical_kind() -> LogicalKind {
                $kind
            }

            fn to_scalar(&self) -> ColumnValue {
                ColumnValue::$variant(self.clone())
            }

            fn from_scalar(value: ColumnValue, column: &str) -> Result<Self> {
                match value {
                    ColumnValue::$variant(v) => Ok(v),
                    other => Err(mismatch(column, Self::logical_kind(), &other)),
                }
            }

            fn zero() -> Self {
                $zero
            }
        }
    };
}

impl_simple_scalar!(bool, LogicalKind::Bool, Bool, false);
impl_simple_scalar!(i16, LogicalKind::Int16, Int16, 0);
impl_simple_scalar!(i32, LogicalKind::Int32, Int32, 0);
impl_simple_scalar!(i64, LogicalKind::Int64, Int64, 0);
impl_simple_scalar!(f32, LogicalKind::Float, Float, 0.0);
impl_simple_scalar!(f64, LogicalKind::Double, Double, 0.0);
impl_simple_scalar!(String, LogicalKind::String, String, String::new());
impl_simple_scalar!(Bytes, LogicalKind::Binary, Binary, Bytes::new());
impl_simple_scalar!(
    DecimalValue,
    LogicalKind::default_decimal(),
    Decimal,
    DecimalValue::default()
);

impl NativeScalar for OffsetDateTime {
    fn logical_kind() -> LogicalKind {
        LogicalKind::default_timestamp()
    }

    fn to_scalar(&self) -> ColumnValue {
        ColumnValue::Timestamp(self.unix_timestamp_nanos())
    }

    fn from_scalar(value: ColumnValue, column: &str) -> Result<Self> {
        match value {
            ColumnValue::Timestamp(nanos) => OffsetDateTime::from_unix_timestamp_nanos(nanos)
                .map_err(|e| Error::coercion(column, e)),
            other => Err(mismatch(column, Self::logical_kind(), &other)),
        }
    }

    fn zero() -> Self {
        OffsetDateTime::UNIX_EPOCH
    }
}

/// Wall-clock date-times are stored as if they were UTC.
impl NativeScalar for PrimitiveDateTime {
    fn logical_kind() -> LogicalKind {
        LogicalKind::default_timestamp()
    }

    fn to_scalar(&self) -> ColumnValue {
        self.assume_utc().to_scalar()
    }

    fn from_scalar(value: ColumnValue, column: &str) -> Result<Self> {
        let instant = OffsetDateTime::from_scalar(value, column)?.to_offset(UtcOffset::UTC);
        Ok(PrimitiveDateTime::new(instant.date(), instant.time()))
    }

    fn zero() -> Self {
        let epoch = OffsetDateTime::UNIX_EPOCH;
        PrimitiveDateTime::new(epoch.date(), epoch.time())
    }
}

impl NativeScalar for Date {
    fn logical_kind() -> LogicalKind {
        LogicalKind::Date
    }

    fn to_scalar(&self) -> ColumnValue {
        ColumnValue::Date(self.to_julian_day() - UNIX_EPOCH_JULIAN_DAY)
    }

    fn from_scalar(value: ColumnValue, column: &str) -> Result<Self> {
        match value {
            ColumnValue::Date(days) => days
                .checked_add(UNIX_EPOCH_JULIAN_DAY)
                .ok_or_else(|| Error::coercion(column, format!("date {days} out of range")))
                .and_then(|julian| {
                    Date::from_julian_day(julian).map_err(|e| Error::coercion(column, e))
                }),
            other => Err(mismatch(column, Self::logical_kind(), &other)),
        }
    }

    fn zero() -> Self {
        OffsetDateTime::UNIX_EPOCH.date()
    }
}

/// Implement [`NativeValue`] for a scalar and its optional and list shapes.
macro_rules! impl_native_shapes {
    ($($t:ty),+ $(,)?) => {$(
        impl NativeValue for $t {
            fn value_kind() -> ValueKind {
                ValueKind::required(<$t as NativeScalar>::logical_kind())
            }

            fn to_column(&self) -> ColumnValue {
                NativeScalar::to_scalar(self)
            }

            fn from_column(value: ColumnValue, column: &str) -> Result<Self> {
                scalar_from_column(value, column)
            }

            fn default_native() -> Self {
                <$t as NativeScalar>::zero()
            }
        }

        impl NativeValue for Option<$t> {
            fn value_kind() -> ValueKind {
                ValueKind::optional(<$t as NativeScalar>::logical_kind())
            }

            fn to_column(&self) -> ColumnValue {
                match self {
                    Some(v) => NativeScalar::to_scalar(v),
                    None => ColumnValue::Null,
                }
            }

            fn from_column(value: ColumnValue, column: &str) -> Result<Self> {
                optional_from_column(value, column)
            }

            fn default_native() -> Self {
                None
            }
        }

        impl NativeValue for Vec<$t> {
            fn value_kind() -> ValueKind {
                ValueKind::list_of(<$t as NativeValue>::value_kind())
            }

            fn to_column(&self) -> ColumnValue {
                list_to_column(self)
            }

            fn from_column(value: ColumnValue, column: &str) -> Result<Self> {
                list_from_column(value, column)
            }

            fn default_native() -> Self {
                Vec::new()
            }
        }

        impl NativeValue for Vec<Option<$t>> {
            fn value_kind() -> ValueKind {
                ValueKind::list_of(<Option<$t> as NativeValue>::value_kind())
            }

            fn to_column(&self) -> ColumnValue {
                list_to_column(self)
            }

            fn from_column(value: ColumnValue, column: &str) -> Result<Self> {
                list_from_column(value, column)
            }

            fn default_native() -> Self {
                Vec::new()
            }
        }

        impl NativeValue for Option<Vec<$t>> {
            fn value_kind() -> ValueKind {
                <Vec<$t> as NativeValue>::value_kind().with_list_nullable()
            }

            fn to_column(&self) -> ColumnValue {
                match self {
                    Some(items) => list_to_column(items),
                    None => ColumnValue::Null,
                }
            }

            fn from_column(value: ColumnValue, column: &str) -> Result<Self> {
                match value {
                    ColumnValue::Null => Ok(None),
                    other => list_from_column(other, column).map(Some),
                }
            }

            fn default_native() -> Self {
                None
            }
        }
    )+};
}

impl_native_shapes!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    Bytes,
    DecimalValue,
    OffsetDateTime,
    PrimitiveDateTime,
    Date,
);

fn scalar_from_column<T: NativeScalar>(value: ColumnValue, column: &str) -> Result<T> {
    if value.is_null() {
        return Err(unexpected_null(column));
    }
    T::from_scalar(value, column)
}

fn optional_from_column<T: NativeScalar>(
    value: ColumnValue,
    column: &str,
) -> Result<Option<T>> {
    match value {
        ColumnValue::Null => Ok(None),
        other => T::from_scalar(other, column).map(Some),
    }
}

fn list_to_column<T: NativeValue>(items: &[T]) -> ColumnValue {
    ColumnValue::List(items.iter().map(NativeValue::to_column).collect())
}

fn list_from_column<T: NativeValue>(value: ColumnValue, column: &str) -> Result<Vec<T>> {
    list_items(value, column)?
        .into_iter()
        .map(|item| T::from_column(item, column))
        .collect()
}
