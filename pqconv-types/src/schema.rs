//! Column descriptors and column schemas.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use pqconv_result::{Error, Result};
use rustc_hash::FxHashSet;

use crate::kind::{LogicalKind, ValueKind};

/// One column of a [`ColumnSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: LogicalKind,
    /// Leaf values may be null.
    pub nullable: bool,
    pub repeated: bool,
    /// For repeated columns: the list slot itself may be null.
    pub list_nullable: bool,
}

impl ColumnDescriptor {
    /// Non-nullable scalar column.
    pub fn new(name: impl Into<String>, kind: LogicalKind) -> Self {
        Self::from_value_kind(name, ValueKind::required(kind))
    }

    pub fn from_value_kind(name: impl Into<String>, shape: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind: shape.kind,
            nullable: shape.nullable,
            repeated: shape.repeated,
            list_nullable: shape.repeated && shape.list_nullable,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn value_kind(&self) -> ValueKind {
        ValueKind {
            kind: self.kind,
            nullable: self.nullable,
            repeated: self.repeated,
            list_nullable: self.list_nullable,
        }
    }

    /// Same column with every value element treated as a single scalar.
    ///
    /// Repeated columns encode their elements through this descriptor.
    pub fn element(&self) -> ColumnDescriptor {
        ColumnDescriptor {
            name: self.name.clone(),
            kind: self.kind,
            nullable: self.nullable,
            repeated: false,
            list_nullable: false,
        }
    }

    pub fn arrow_field(&self) -> Field {
        self.value_kind().arrow_field(&self.name)
    }

    pub fn data_type(&self) -> DataType {
        self.arrow_field().data_type().clone()
    }

    /// Classify a stored Arrow field.
    pub fn from_arrow_field(field: &Field) -> Result<Self> {
        let unsupported = || {
            Error::Schema(format!(
                "column '{}' has unsupported type {}",
                field.name(),
                field.data_type()
            ))
        };
        let shape = match field.data_type() {
            DataType::List(item) | DataType::LargeList(item) => {
                let kind = LogicalKind::from_arrow(item.data_type()).ok_or_else(unsupported)?;
                ValueKind {
                    kind,
                    nullable: item.is_nullable(),
                    repeated: true,
                    list_nullable: field.is_nullable(),
                }
            }
            other => {
                let kind = LogicalKind::from_arrow(other).ok_or_else(unsupported)?;
                ValueKind {
                    kind,
                    nullable: field.is_nullable(),
                    repeated: false,
                    list_nullable: false,
                }
            }
        };
        Ok(Self::from_value_kind(field.name().clone(), shape))
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value_kind())
    }
}

/// Ordered set of uniquely named columns describing one record type.
///
/// Order defines the physical column order on write. Reads match columns by
/// name, so two schemas with the same columns in a different order describe
/// the same data but are *not* equal for append compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ColumnSchema {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSchema {
    /// Build a schema, rejecting empty or duplicate column names.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut seen = FxHashSet::default();
        for column in &columns {
            if column.name.is_empty() {
                return Err(Error::Schema("column name must not be empty".into()));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::Schema(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_arrow(&self) -> SchemaRef {
        Arc::new(Schema::new(
            self.columns
                .iter()
                .map(ColumnDescriptor::arrow_field)
                .collect::<Vec<_>>(),
        ))
    }

    /// Classify a stored Arrow schema.
    pub fn from_arrow(schema: &Schema) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnDescriptor::from_arrow_field(f))
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Describe the first structural difference from `other`, if any.
    pub fn difference(&self, other: &ColumnSchema) -> Option<String> {
        if self == other {
            return None;
        }
        if self.len() != other.len() {
            return Some(format!(
                "expected {} columns [{}], found {} columns [{}]",
                self.len(),
                self.names().join(", "),
                other.len(),
                other.names().join(", ")
            ));
        }
        self.columns
            .iter()
            .zip(&other.columns)
            .enumerate()
            .find(|(_, (a, b))| a != b)
            .map(|(idx, (a, b))| format!("column {idx}: expected {a}, found {b}"))
    }
}

impl<'a> IntoIterator for &'a ColumnSchema {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str("}")
    }
}
