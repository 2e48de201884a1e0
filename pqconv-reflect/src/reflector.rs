//! Schema derivation and the per-type binding cache.
//!
//! [`binding`] walks a [`Record`] type once, classifies every retained slot
//! into a [`ColumnDescriptor`] and keeps the result, together with the slot
//! accessors, for the lifetime of the process. Later calls for the same type
//! return the cached `Arc`.
//!
//! The cache is keyed by [`TypeId`], so each instantiation of a generic
//! record is a separate entry. Concurrent first use may compute the same
//! binding more than once; the first one inserted is kept and every caller
//! receives that one.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use pqconv_result::{Error, Result};
use pqconv_types::{ColumnDescriptor, ColumnSchema, ColumnValue};
use rustc_hash::FxHashMap;

use crate::record::{FieldAccess, Record, walk};

type BindingCache = RwLock<FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static BINDINGS: OnceLock<BindingCache> = OnceLock::new();

fn cache() -> &'static BindingCache {
    BINDINGS.get_or_init(|| RwLock::new(FxHashMap::default()))
}

/// A column descriptor bound to a slot of `R`.
pub struct BoundField<R> {
    descriptor: ColumnDescriptor,
    ident: &'static str,
    access: Arc<dyn FieldAccess<R>>,
}

impl<R> BoundField<R> {
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// Effective column name (after renaming).
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Rust-side identifier the field was declared with.
    pub fn ident(&self) -> &'static str {
        self.ident
    }

    #[inline]
    pub fn read(&self, record: &R) -> ColumnValue {
        self.access.read(record)
    }

    #[inline]
    pub fn write(&self, record: &mut R, value: ColumnValue) -> Result<()> {
        self.access.write(record, value, &self.descriptor.name)
    }

    #[inline]
    pub fn reset(&self, record: &mut R) {
        self.access.reset(record)
    }

    /// Same slot bound to a different descriptor.
    fn rebind(&self, descriptor: ColumnDescriptor) -> Self {
        Self {
            descriptor,
            ident: self.ident,
            access: Arc::clone(&self.access),
        }
    }
}

impl<R> fmt::Debug for BoundField<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundField")
            .field("ident", &self.ident)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Derived schema of `R` plus one bound field per column, in column order.
pub struct TypeBinding<R> {
    schema: ColumnSchema,
    fields: Vec<BoundField<R>>,
}

impl<R: Record> TypeBinding<R> {
    fn derive() -> Result<Self> {
        let mut fields = Vec::new();
        for slot in walk::<R>() {
            let shape = slot.value_kind()?;
            fields.push(BoundField {
                descriptor: ColumnDescriptor::from_value_kind(slot.column_name(), shape),
                ident: slot.ident(),
                access: slot.access(),
            });
        }
        let schema = ColumnSchema::new(fields.iter().map(|f| f.descriptor.clone()).collect())
            .map_err(|e| match e {
                Error::Schema(msg) => {
                    Error::Schema(format!("{}: {msg}", std::any::type_name::<R>()))
                }
                other => other,
            })?;
        Ok(Self { schema, fields })
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn fields(&self) -> &[BoundField<R>] {
        &self.fields
    }

    /// Bound field for an effective column name.
    pub fn field(&self, name: &str) -> Option<&BoundField<R>> {
        self.fields.iter().find(|f| f.descriptor.name == name)
    }

    /// Bind an externally supplied schema to the slots of `R`.
    ///
    /// Every column must name a retained slot whose kind belongs to the same
    /// family and whose repetition matches. The supplied descriptor (its
    /// precision, scale, unit and nullability) replaces the derived one.
    pub fn project(&self, schema: &ColumnSchema) -> Result<Vec<BoundField<R>>> {
        schema
            .iter()
            .map(|column| {
                let field = self.field(&column.name).ok_or_else(|| {
                    Error::SchemaMismatch(format!(
                        "column '{}' does not name a field of {}",
                        column.name,
                        std::any::type_name::<R>()
                    ))
                })?;
                let own = &field.descriptor;
                if !own.kind.same_family(&column.kind) || own.repeated != column.repeated {
                    return Err(Error::SchemaMismatch(format!(
                        "column '{}': field {} declares {}, schema has {}",
                        column.name,
                        field.ident,
                        own.value_kind(),
                        column.value_kind()
                    )));
                }
                Ok(field.rebind(column.clone()))
            })
            .collect()
    }
}

impl<R> fmt::Debug for TypeBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBinding")
            .field("schema", &self.schema)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Cached binding for `R`, deriving it on first use.
///
/// A type whose derivation fails is not cached; every call reports the error
/// again.
pub fn binding<R: Record>() -> Result<Arc<TypeBinding<R>>> {
    let key = TypeId::of::<R>();
    let cached = cache()
        .read()
        .expect("binding cache poisoned")
        .get(&key)
        .cloned();
    if let Some(entry) = cached {
        tracing::trace!(ty = std::any::type_name::<R>(), "reflect: cache hit");
        return downcast(entry);
    }

    let derived: Arc<dyn Any + Send + Sync> = Arc::new(TypeBinding::<R>::derive()?);
    let entry = {
        let mut map = cache().write().expect("binding cache poisoned");
        Arc::clone(map.entry(key).or_insert(derived))
    };
    let binding = downcast::<R>(entry)?;
    tracing::debug!(
        ty = std::any::type_name::<R>(),
        columns = binding.schema.len(),
        schema = %binding.schema,
        "reflect: derived schema"
    );
    Ok(binding)
}

fn downcast<R: Record>(entry: Arc<dyn Any + Send + Sync>) -> Result<Arc<TypeBinding<R>>> {
    entry.downcast::<TypeBinding<R>>().map_err(|_| {
        Error::Internal(format!(
            "binding cache entry for {} has the wrong type",
            std::any::type_name::<R>()
        ))
    })
}

/// Column schema of `R`.
pub fn reflect<R: Record>() -> Result<ColumnSchema> {
    Ok(binding::<R>()?.schema.clone())
}

/// Number of record types currently cached.
pub fn cached_type_count() -> usize {
    cache().read().expect("binding cache poisoned").len()
}
