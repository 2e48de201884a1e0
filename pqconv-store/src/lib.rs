//! Row-group containers for pqconv.
//!
//! [`ColumnStore`], [`RowGroupSink`] and [`RowGroupSource`] are the
//! column-store interface the conversion engine writes and reads through.
//! [`PagerStore`] implements it on top of a
//! [`Pager`](pqconv_storage::Pager): every row group is encoded as a
//! self-contained Parquet blob, and a bitcode catalog at the pager's root key
//! records each container's Arrow schema and ordered row groups.
//!
//! ```rust
//! use std::sync::Arc;
//! use arrow::array::Int32Array;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use pqconv_storage::MemPager;
//! use pqconv_store::{ColumnStore, PagerStore, RowGroupSink, RowGroupSource, WriterConfig};
//!
//! # fn main() -> pqconv_result::Result<()> {
//! let store = PagerStore::open(Arc::new(MemPager::new()))?;
//! let schema = Arc::new(Schema::new(vec![Field::new("Id", DataType::Int32, false)]));
//!
//! let mut writer = store.open_for_write("ids", schema.clone(), &WriterConfig::default())?;
//! writer.append_row_group(RecordBatch::try_new(
//!     schema,
//!     vec![Arc::new(Int32Array::from(vec![1, 2, 3]))],
//! )?)?;
//! writer.finish()?;
//!
//! let reader = store.open_for_read("ids")?;
//! assert_eq!(reader.row_group_count(), 1);
//! assert_eq!(reader.read_row_group(0)?.num_rows(), 3);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod reader;
pub mod store;
pub mod traits;
pub mod types;
pub mod writer;

pub use catalog::{ContainerCatalog, ContainerMetadata, RowGroupRef};
pub use store::{ContainerReader, ContainerWriter, PagerStore};
pub use traits::{ColumnStore, RowGroupSink, RowGroupSource};
pub use types::{RowGroupHandle, RowGroupId};
pub use writer::{CompressionMethod, WriterConfig};

pub use arrow::datatypes::SchemaRef;
pub use arrow::record_batch::RecordBatch;
