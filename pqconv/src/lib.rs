//! Typed records to and from row-group chunked Parquet containers.
//!
//! A record type describes its fields once by implementing [`Record`]. From
//! that description pqconv derives a [`ColumnSchema`], writes sequences of
//! records as row groups through a [`ColumnStore`], and reads them back in
//! full, one row group at a time, or lazily. Reads match columns by name, so
//! a record type may be read through a narrower, wider, or renamed view of
//! the stored data.
//!
//! ```rust
//! use std::sync::Arc;
//! use pqconv::{FieldSet, MemPager, PagerStore, Record, SerializeOptions};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Row {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl Record for Row {
//!     fn describe(fields: &mut FieldSet<Self>) {
//!         fields.field("Id", |r| &r.id, |r| &mut r.id);
//!         fields.field("Name", |r| &r.name, |r| &mut r.name);
//!     }
//! }
//!
//! # fn main() -> pqconv::Result<()> {
//! let store = PagerStore::open(Arc::new(MemPager::new()))?;
//! let rows: Vec<Row> = (0..10)
//!     .map(|i| Row { id: i, name: format!("row {i}") })
//!     .collect();
//!
//! let options = SerializeOptions::new().with_row_group_size(2);
//! pqconv::serialize::<Row, _, _>(&rows, &store, "rows", &options)?;
//!
//! let group: Vec<Row> = pqconv::deserialize_group(&store, "rows", 2)?;
//! assert_eq!(group, rows[4..6]);
//! assert_eq!(pqconv::deserialize_all::<Row, _>(&store, "rows")?, rows);
//! # Ok(())
//! # }
//! ```

pub mod deserialize;
pub mod options;
pub mod serialize;

pub use deserialize::{
    Projection, RowGroups, deserialize_all, deserialize_group, deserialize_groups_lazy,
};
pub use options::{DEFAULT_ROW_GROUP_SIZE, SerializeOptions};
pub use serialize::serialize;

pub use pqconv_reflect::{FieldMarker, FieldSet, FieldSlot, NativeValue, Record, reflect};
pub use pqconv_result::{Error, Result};
pub use pqconv_storage::{MemPager, Pager};
pub use pqconv_store::{
    ColumnStore, CompressionMethod, PagerStore, RowGroupHandle, RowGroupSink, RowGroupSource,
    WriterConfig,
};
pub use pqconv_types::{
    ColumnDescriptor, ColumnSchema, DecimalValue, LogicalKind, TimeUnit, ValueKind,
};
