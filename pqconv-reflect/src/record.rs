//! Record types and their field walk.
//!
//! A record type describes itself once through [`Record::describe`], listing
//! its fields in declaration order together with accessors and markers:
//!
//! ```rust
//! use pqconv_reflect::{FieldSet, Record};
//!
//! #[derive(Default)]
//! struct Person {
//!     id: i32,
//!     person_name: String,
//!     ssn: String,
//! }
//!
//! impl Record for Person {
//!     fn describe(fields: &mut FieldSet<Self>) {
//!         fields.field("Id", |r| &r.id, |r| &mut r.id);
//!         fields
//!             .field("PersonName", |r| &r.person_name, |r| &mut r.person_name)
//!             .rename("Name");
//!         fields.field("SSN", |r| &r.ssn, |r| &mut r.ssn).ignore();
//!     }
//! }
//!
//! let names: Vec<_> = pqconv_reflect::walk::<Person>()
//!     .iter()
//!     .map(|slot| slot.column_name().to_owned())
//!     .collect();
//! assert_eq!(names, ["Id", "Name"]);
//! ```
//!
//! Markers are resolved when the schema is derived, never per record.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use pqconv_result::{Error, Result};
use pqconv_types::{ColumnValue, LogicalKind, TimeUnit, ValueKind};

use crate::native::NativeValue;

/// A host type that can be written to and read from row groups.
///
/// `Default` supplies the starting value for every reconstructed record, so
/// ignored fields come back as their default.
pub trait Record: Default + Send + Sync + 'static {
    /// Declare the fields of this type, in order.
    fn describe(fields: &mut FieldSet<Self>);
}

/// Customization attached to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMarker {
    /// Exclude the field from the schema. It is never written, and on read it
    /// keeps the value produced by `Default`.
    Ignore,
    /// Store the field under another column name.
    Rename(String),
    /// Decimal precision and scale, replacing the default `(38, 18)`.
    Decimal { precision: u8, scale: i8 },
    /// Timestamp storage unit, replacing the default milliseconds.
    TimestampUnit(TimeUnit),
}

/// Type-erased access to one field of `R`.
pub trait FieldAccess<R>: Send + Sync {
    fn read(&self, record: &R) -> ColumnValue;

    fn write(&self, record: &mut R, value: ColumnValue, column: &str) -> Result<()>;

    /// Overwrite the field with its native default.
    fn reset(&self, record: &mut R);
}

struct Accessor<G, M, V> {
    get: G,
    get_mut: M,
    _value: PhantomData<fn() -> V>,
}

impl<R, V, G, M> FieldAccess<R> for Accessor<G, M, V>
where
    V: NativeValue,
    G: Fn(&R) -> &V + Send + Sync,
    M: Fn(&mut R) -> &mut V + Send + Sync,
{
    fn read(&self, record: &R) -> ColumnValue {
        (self.get)(record).to_column()
    }

    fn write(&self, record: &mut R, value: ColumnValue, column: &str) -> Result<()> {
        *(self.get_mut)(record) = V::from_column(value, column)?;
        Ok(())
    }

    fn reset(&self, record: &mut R) {
        *(self.get_mut)(record) = V::default_native();
    }
}

/// One declared field: identifier, shape, markers and accessor.
pub struct FieldSlot<R> {
    ident: &'static str,
    value_kind: ValueKind,
    markers: Vec<FieldMarker>,
    access: Arc<dyn FieldAccess<R>>,
}

impl<R> FieldSlot<R> {
    /// Store this field under `name` instead of its identifier.
    pub fn rename(&mut self, name: impl Into<String>) -> &mut Self {
        self.markers.push(FieldMarker::Rename(name.into()));
        self
    }

    /// Leave this field out of the schema.
    pub fn ignore(&mut self) -> &mut Self {
        self.markers.push(FieldMarker::Ignore);
        self
    }

    /// Declare decimal precision and scale.
    pub fn decimal(&mut self, precision: u8, scale: i8) -> &mut Self {
        self.markers.push(FieldMarker::Decimal { precision, scale });
        self
    }

    /// Declare the timestamp storage unit.
    pub fn timestamp_unit(&mut self, unit: TimeUnit) -> &mut Self {
        self.markers.push(FieldMarker::TimestampUnit(unit));
        self
    }

    pub fn ident(&self) -> &'static str {
        self.ident
    }

    pub fn is_ignored(&self) -> bool {
        self.markers.contains(&FieldMarker::Ignore)
    }

    /// Column name after renaming. The last rename marker wins.
    pub fn column_name(&self) -> &str {
        self.markers
            .iter()
            .rev()
            .find_map(|m| match m {
                FieldMarker::Rename(name) => Some(name.as_str()),
                _ => None,
            })
            .unwrap_or(self.ident)
    }

    /// Shape with decimal and timestamp markers applied.
    pub fn value_kind(&self) -> Result<ValueKind> {
        let mut shape = self.value_kind;
        for marker in &self.markers {
            match (marker, shape.kind) {
                (FieldMarker::Decimal { precision, scale }, LogicalKind::Decimal { .. }) => {
                    shape = shape.with_kind(LogicalKind::Decimal {
                        precision: *precision,
                        scale: *scale,
                    });
                }
                (FieldMarker::TimestampUnit(unit), LogicalKind::Timestamp(_)) => {
                    shape = shape.with_kind(LogicalKind::Timestamp(*unit));
                }
                (FieldMarker::Decimal { .. } | FieldMarker::TimestampUnit(_), kind) => {
                    return Err(Error::Schema(format!(
                        "field '{}' of kind {kind} cannot take marker {marker:?}",
                        self.ident
                    )));
                }
                (FieldMarker::Ignore | FieldMarker::Rename(_), _) => {}
            }
        }
        shape
            .kind
            .validate()
            .map_err(|msg| Error::Schema(format!("field '{}': {msg}", self.ident)))?;
        Ok(shape)
    }

    pub(crate) fn access(&self) -> Arc<dyn FieldAccess<R>> {
        Arc::clone(&self.access)
    }
}

impl<R> fmt::Debug for FieldSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSlot")
            .field("ident", &self.ident)
            .field("value_kind", &self.value_kind)
            .field("markers", &self.markers)
            .finish()
    }
}

/// Ordered field declarations collected from [`Record::describe`].
pub struct FieldSet<R> {
    slots: Vec<FieldSlot<R>>,
}

impl<R: 'static> FieldSet<R> {
    fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Declare a field. `ident` is the column name unless renamed.
    ///
    /// Generic records resolve their type parameters here: the slot's shape
    /// comes from `V::value_kind()` of the concrete instantiation.
    pub fn field<V, G, M>(&mut self, ident: &'static str, get: G, get_mut: M) -> &mut FieldSlot<R>
    where
        V: NativeValue,
        G: Fn(&R) -> &V + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut V + Send + Sync + 'static,
    {
        self.slots.push(FieldSlot {
            ident,
            value_kind: V::value_kind(),
            markers: Vec::new(),
            access: Arc::new(Accessor {
                get,
                get_mut,
                _value: PhantomData,
            }),
        });
        let last = self.slots.len() - 1;
        &mut self.slots[last]
    }

    pub fn into_slots(self) -> Vec<FieldSlot<R>> {
        self.slots
    }
}

/// Every slot `R` declares, ignored ones included, in declaration order.
pub fn declared_fields<R: Record>() -> Vec<FieldSlot<R>> {
    let mut fields = FieldSet::new();
    R::describe(&mut fields);
    fields.into_slots()
}

/// Retained slots of `R` in declaration order. Ignored fields are excluded.
pub fn walk<R: Record>() -> Vec<FieldSlot<R>> {
    declared_fields::<R>()
        .into_iter()
        .filter(|slot| !slot.is_ignored())
        .collect()
}
