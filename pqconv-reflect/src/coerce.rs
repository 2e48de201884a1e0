//! Column side of the coercion layer: canonical values to Arrow arrays and
//! back.
//!
//! Encoding is driven by the *target* descriptor and enforces its
//! constraints: nullability, decimal precision and scale, timestamp unit.
//! Decoding is driven by the *stored* descriptor and never fails on
//! nullability; nulls are rejected later by the native slot they are read
//! into.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Decimal128Array,
    Float32Array, Float64Array, GenericListArray, Int16Array, Int32Array, Int64Array, ListArray,
    OffsetSizeTrait, StringArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{
    Date32Type, Decimal128Type, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use bytes::Bytes;
use pqconv_result::{Error, Result};
use pqconv_types::{ColumnDescriptor, ColumnValue, DecimalValue, LogicalKind, TIMESTAMP_TZ};

/// Nanoseconds per timestamp unit.
fn nanos_per(unit: TimeUnit) -> i128 {
    match unit {
        TimeUnit::Second => 1_000_000_000,
        TimeUnit::Millisecond => 1_000_000,
        TimeUnit::Microsecond => 1_000,
        TimeUnit::Nanosecond => 1,
    }
}

fn mismatch(desc: &ColumnDescriptor, got: &ColumnValue) -> Error {
    Error::coercion(
        &desc.name,
        format!("expected {} value, got {}", desc.kind, got.type_name()),
    )
}

/// Gather the cells of a scalar column, checking nulls against `desc`.
fn collect<'a, T>(
    desc: &ColumnDescriptor,
    values: &'a [ColumnValue],
    mut extract: impl FnMut(&'a ColumnValue) -> Result<T>,
) -> Result<Vec<Option<T>>> {
    values
        .iter()
        .map(|value| match value {
            ColumnValue::Null if desc.nullable => Ok(None),
            ColumnValue::Null => Err(Error::coercion(
                &desc.name,
                "null written into non-nullable column",
            )),
            other => extract(other).map(Some),
        })
        .collect()
}

macro_rules! encode_primitive {
    ($desc:expr, $values:expr, $array:ty, $variant:ident) => {
        Arc::new(<$array>::from(collect($desc, $values, |v| match v {
            ColumnValue::$variant(x) => Ok(*x),
            other => Err(mismatch($desc, other)),
        })?)) as ArrayRef
    };
}

/// Build the Arrow array for one column of a row group.
pub fn encode_column(desc: &ColumnDescriptor, values: &[ColumnValue]) -> Result<ArrayRef> {
    if desc.repeated {
        return encode_list(desc, values);
    }
    let array = match desc.kind {
        LogicalKind::Bool => encode_primitive!(desc, values, BooleanArray, Bool),
        LogicalKind::Int16 => encode_primitive!(desc, values, Int16Array, Int16),
        LogicalKind::Int32 => encode_primitive!(desc, values, Int32Array, Int32),
        LogicalKind::Int64 => encode_primitive!(desc, values, Int64Array, Int64),
        LogicalKind::Float => encode_primitive!(desc, values, Float32Array, Float),
        LogicalKind::Double => encode_primitive!(desc, values, Float64Array, Double),
        LogicalKind::Date => encode_primitive!(desc, values, Date32Array, Date),
        LogicalKind::String => {
            let cells = collect(desc, values, |v| match v {
                ColumnValue::String(s) => Ok(s.as_str()),
                other => Err(mismatch(desc, other)),
            })?;
            Arc::new(cells.into_iter().collect::<StringArray>()) as ArrayRef
        }
        LogicalKind::Binary => {
            let cells = collect(desc, values, |v| match v {
                ColumnValue::Binary(b) => Ok(b.as_ref()),
                other => Err(mismatch(desc, other)),
            })?;
            Arc::new(cells.into_iter().collect::<BinaryArray>()) as ArrayRef
        }
        LogicalKind::Decimal { precision, scale } => {
            let cells = collect(desc, values, |v| match v {
                ColumnValue::Decimal(d) => encode_decimal(desc, *d, precision, scale),
                other => Err(mismatch(desc, other)),
            })?;
            Arc::new(Decimal128Array::from(cells).with_precision_and_scale(precision, scale)?)
                as ArrayRef
        }
        LogicalKind::Timestamp(unit) => {
            let divisor = nanos_per(unit);
            let cells = collect(desc, values, |v| match v {
                // Floor division drops any component finer than the unit.
                ColumnValue::Timestamp(nanos) => i64::try_from(nanos.div_euclid(divisor))
                    .map_err(|_| {
                        Error::coercion(
                            &desc.name,
                            format!("timestamp {nanos}ns does not fit {unit:?} storage"),
                        )
                    }),
                other => Err(mismatch(desc, other)),
            })?;
            match unit {
                TimeUnit::Second => {
                    Arc::new(TimestampSecondArray::from(cells).with_timezone(TIMESTAMP_TZ))
                        as ArrayRef
                }
                TimeUnit::Millisecond => {
                    Arc::new(TimestampMillisecondArray::from(cells).with_timezone(TIMESTAMP_TZ))
                        as ArrayRef
                }
                TimeUnit::Microsecond => {
                    Arc::new(TimestampMicrosecondArray::from(cells).with_timezone(TIMESTAMP_TZ))
                        as ArrayRef
                }
                TimeUnit::Nanosecond => {
                    Arc::new(TimestampNanosecondArray::from(cells).with_timezone(TIMESTAMP_TZ))
                        as ArrayRef
                }
            }
        }
    };
    Ok(array)
}

fn encode_decimal(
    desc: &ColumnDescriptor,
    value: DecimalValue,
    precision: u8,
    scale: i8,
) -> Result<i128> {
    if value.scale() > scale {
        return Err(Error::coercion(
            &desc.name,
            format!(
                "value {value} has scale {} which exceeds column scale {scale}",
                value.scale()
            ),
        ));
    }
    value
        .rescale_up(scale)
        .and_then(|v| v.check_precision(precision))
        .map(DecimalValue::raw_value)
        .map_err(|e| Error::coercion(&desc.name, e))
}

fn encode_list(desc: &ColumnDescriptor, values: &[ColumnValue]) -> Result<ArrayRef> {
    let element = desc.element();
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut validity = Vec::with_capacity(values.len());
    let mut flat = Vec::new();
    offsets.push(0i32);

    for value in values {
        match value {
            ColumnValue::List(items) => {
                flat.extend(items.iter().cloned());
                validity.push(true);
            }
            ColumnValue::Null if desc.list_nullable => validity.push(false),
            ColumnValue::Null => {
                return Err(Error::coercion(
                    &desc.name,
                    "null list written into non-nullable column",
                ));
            }
            other => {
                return Err(Error::coercion(
                    &desc.name,
                    format!("expected list value, got {}", other.type_name()),
                ));
            }
        }
        let end = i32::try_from(flat.len())
            .map_err(|_| Error::coercion(&desc.name, "list elements exceed i32 offsets"))?;
        offsets.push(end);
    }

    let child = encode_column(&element, &flat)?;
    let nulls = validity
        .iter()
        .any(|valid| !valid)
        .then(|| NullBuffer::from(validity));
    let item = Arc::new(Field::new_list_field(desc.kind.arrow_type(), desc.nullable));
    let list = ListArray::try_new(
        item,
        OffsetBuffer::new(ScalarBuffer::from(offsets)),
        child,
        nulls,
    )?;
    Ok(Arc::new(list))
}

fn wrong_array(desc: &ColumnDescriptor, array: &dyn Array) -> Error {
    Error::coercion(
        &desc.name,
        format!(
            "stored array of type {} does not match column kind {}",
            array.data_type(),
            desc.value_kind()
        ),
    )
}

macro_rules! decode_primitive {
    ($desc:expr, $array:expr, $ty:ty, |$v:ident| $map:expr) => {{
        let typed = $array
            .as_primitive_opt::<$ty>()
            .ok_or_else(|| wrong_array($desc, $array))?;
        typed
            .iter()
            .map(|cell| match cell {
                Some($v) => $map,
                None => ColumnValue::Null,
            })
            .collect()
    }};
}

/// Read one stored column into canonical values, one per row.
///
/// `desc` is the stored descriptor of the column.
pub fn decode_column(desc: &ColumnDescriptor, array: &dyn Array) -> Result<Vec<ColumnValue>> {
    if desc.repeated {
        if let Some(list) = array.as_list_opt::<i32>() {
            return decode_list(desc, list);
        }
        if let Some(list) = array.as_list_opt::<i64>() {
            return decode_list(desc, list);
        }
        return Err(wrong_array(desc, array));
    }

    let values: Vec<ColumnValue> = match desc.kind {
        LogicalKind::Bool => {
            let typed = array
                .as_boolean_opt()
                .ok_or_else(|| wrong_array(desc, array))?;
            typed
                .iter()
                .map(|cell| cell.map_or(ColumnValue::Null, ColumnValue::Bool))
                .collect()
        }
        LogicalKind::Int16 => decode_primitive!(desc, array, Int16Type, |v| ColumnValue::Int16(v)),
        LogicalKind::Int32 => decode_primitive!(desc, array, Int32Type, |v| ColumnValue::Int32(v)),
        LogicalKind::Int64 => decode_primitive!(desc, array, Int64Type, |v| ColumnValue::Int64(v)),
        LogicalKind::Float => {
            decode_primitive!(desc, array, Float32Type, |v| ColumnValue::Float(v))
        }
        LogicalKind::Double => {
            decode_primitive!(desc, array, Float64Type, |v| ColumnValue::Double(v))
        }
        LogicalKind::Date => decode_primitive!(desc, array, Date32Type, |v| ColumnValue::Date(v)),
        LogicalKind::String => {
            let typed = array
                .as_string_opt::<i32>()
                .ok_or_else(|| wrong_array(desc, array))?;
            typed
                .iter()
                .map(|cell| cell.map_or(ColumnValue::Null, |s| ColumnValue::String(s.to_owned())))
                .collect()
        }
        LogicalKind::Binary => {
            let typed = array
                .as_binary_opt::<i32>()
                .ok_or_else(|| wrong_array(desc, array))?;
            typed
                .iter()
                .map(|cell| {
                    cell.map_or(ColumnValue::Null, |b| {
                        ColumnValue::Binary(Bytes::copy_from_slice(b))
                    })
                })
                .collect()
        }
        LogicalKind::Decimal { scale, .. } => {
            let typed = array
                .as_primitive_opt::<Decimal128Type>()
                .ok_or_else(|| wrong_array(desc, array))?;
            typed
                .iter()
                .map(|cell| match cell {
                    Some(raw) => DecimalValue::new(raw, scale)
                        .map(ColumnValue::Decimal)
                        .map_err(|e| Error::coercion(&desc.name, e)),
                    None => Ok(ColumnValue::Null),
                })
                .collect::<Result<Vec<_>>>()?
        }
        LogicalKind::Timestamp(unit) => {
            let factor = nanos_per(unit);
            match unit {
                TimeUnit::Second => decode_primitive!(desc, array, TimestampSecondType, |v| {
                    ColumnValue::Timestamp(v as i128 * factor)
                }),
                TimeUnit::Millisecond => {
                    decode_primitive!(desc, array, TimestampMillisecondType, |v| {
                        ColumnValue::Timestamp(v as i128 * factor)
                    })
                }
                TimeUnit::Microsecond => {
                    decode_primitive!(desc, array, TimestampMicrosecondType, |v| {
                        ColumnValue::Timestamp(v as i128 * factor)
                    })
                }
                TimeUnit::Nanosecond => {
                    decode_primitive!(desc, array, TimestampNanosecondType, |v| {
                        ColumnValue::Timestamp(v as i128)
                    })
                }
            }
        }
    };
    Ok(values)
}

fn decode_list<O: OffsetSizeTrait>(
    desc: &ColumnDescriptor,
    list: &GenericListArray<O>,
) -> Result<Vec<ColumnValue>> {
    let element = desc.element();
    let mut out = Vec::with_capacity(list.len());
    for row in 0..list.len() {
        if list.is_null(row) {
            out.push(ColumnValue::Null);
            continue;
        }
        let items = list.value(row);
        out.push(ColumnValue::List(decode_column(&element, items.as_ref())?));
    }
    Ok(out)
}

/// Check that a stored column can be read into a target column.
///
/// Kinds must belong to the same family and repetition must agree.
/// Nullability is not checked here: a nullable stored column can be read
/// into a required slot as long as it holds no nulls.
pub fn check_compatible(stored: &ColumnDescriptor, target: &ColumnDescriptor) -> Result<()> {
    if stored.repeated != target.repeated || !stored.kind.same_family(&target.kind) {
        return Err(Error::coercion(
            &target.name,
            format!(
                "stored column is {} but the target field is {}",
                stored.value_kind(),
                target.value_kind()
            ),
        ));
    }
    Ok(())
}
