//! Row group writer.

use std::borrow::Borrow;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use pqconv_reflect::{BoundField, Record, binding, encode_column};
use pqconv_result::{Error, Result};
use pqconv_store::{ColumnStore, RowGroupSink};
use pqconv_types::{ColumnSchema, ColumnValue};

use crate::options::SerializeOptions;

/// Canonical values of up to `capacity` records, column by column.
struct RowGroupBuffer<'a, R> {
    fields: &'a [BoundField<R>],
    columns: Vec<Vec<ColumnValue>>,
    rows: usize,
    capacity: usize,
}

impl<'a, R> RowGroupBuffer<'a, R> {
    fn new(fields: &'a [BoundField<R>], capacity: usize) -> Self {
        // Small first allocation; huge row group sizes should not reserve
        // memory for rows that never arrive.
        let reserve = capacity.min(1024);
        Self {
            fields,
            columns: fields.iter().map(|_| Vec::with_capacity(reserve)).collect(),
            rows: 0,
            capacity,
        }
    }

    fn push(&mut self, record: &R) {
        for (field, column) in self.fields.iter().zip(&mut self.columns) {
            column.push(field.read(record));
        }
        self.rows += 1;
    }

    fn is_full(&self) -> bool {
        self.rows >= self.capacity
    }

    fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Encode the buffered rows and reset the buffer.
    fn flush(&mut self, schema: &SchemaRef) -> Result<RecordBatch> {
        let arrays = self
            .fields
            .iter()
            .zip(&mut self.columns)
            .map(|(field, column)| {
                let array = encode_column(field.descriptor(), column);
                column.clear();
                array
            })
            .collect::<Result<Vec<_>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(self.rows));
        let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;
        self.rows = 0;
        Ok(batch)
    }
}

/// Write `records` to `destination` in row groups of at most
/// `options.row_group_size` records.
///
/// Returns the column schema that was written. Nothing becomes visible at
/// `destination` unless every row group was stored: on error a new container
/// is not created, a replaced container keeps its old contents, and an
/// append adds nothing.
///
/// With `options.append` the destination must already hold a container
/// whose schema equals the effective schema, otherwise
/// [`Error::SchemaMismatch`] is returned. Without it an existing container is
/// replaced. An empty `records` still creates a container holding only the
/// schema.
pub fn serialize<R, S, I>(
    records: I,
    store: &S,
    destination: &str,
    options: &SerializeOptions,
) -> Result<ColumnSchema>
where
    R: Record,
    S: ColumnStore,
    I: IntoIterator,
    I::Item: Borrow<R>,
{
    if options.row_group_size == 0 {
        return Err(Error::InvalidArgumentError(
            "row group size must be at least 1".into(),
        ));
    }

    let binding = binding::<R>()?;
    let schema = match &options.schema {
        Some(schema) => schema.clone(),
        None => binding.schema().clone(),
    };
    if schema.is_empty() {
        return Err(Error::Schema(format!(
            "{} has no columns to write",
            std::any::type_name::<R>()
        )));
    }
    let fields = binding.project(&schema)?;
    let arrow_schema = schema.to_arrow();
    let config = options.writer_config();

    let mut writer = if options.append {
        let writer = store
            .open_for_append(destination, &config)
            .map_err(|e| match e {
                Error::NotFound => Error::SchemaMismatch(format!(
                    "cannot append to '{destination}': no container exists"
                )),
                other => other,
            })?;
        let stored = ColumnSchema::from_arrow(&writer.schema())?;
        if let Some(difference) = stored.difference(&schema) {
            return Err(Error::SchemaMismatch(format!(
                "cannot append to '{destination}': {difference}"
            )));
        }
        writer
    } else {
        store.open_for_write(destination, arrow_schema.clone(), &config)?
    };
    tracing::debug!(
        destination,
        append = options.append,
        row_group_size = options.row_group_size,
        schema = %schema,
        "serialize: start"
    );

    let mut buffer = RowGroupBuffer::new(&fields, options.row_group_size);
    let mut total_rows = 0usize;
    let mut row_groups = 0usize;
    for record in records {
        buffer.push(record.borrow());
        if buffer.is_full() {
            let batch = buffer.flush(&arrow_schema)?;
            total_rows += batch.num_rows();
            let id = writer.append_row_group(batch)?;
            row_groups += 1;
            tracing::trace!(destination, row_group = %id, "serialize: flushed row group");
        }
    }
    if !buffer.is_empty() {
        let batch = buffer.flush(&arrow_schema)?;
        total_rows += batch.num_rows();
        let id = writer.append_row_group(batch)?;
        row_groups += 1;
        tracing::trace!(destination, row_group = %id, "serialize: flushed row group");
    }

    let stored_groups = writer.finish()?;
    tracing::debug!(
        destination,
        rows = total_rows,
        row_groups,
        stored_groups,
        "serialize: done"
    );
    Ok(schema)
}
