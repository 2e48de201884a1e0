//! Row group decoding.

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pqconv_result::{Error, Result};

/// Decode a row group blob written by
/// [`write_row_group_to_memory`](crate::writer::write_row_group_to_memory)
/// into a single batch.
pub fn read_row_group_from_memory(bytes: Bytes) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let schema = builder.schema().clone();
    let rows = usize::try_from(builder.metadata().file_metadata().num_rows())
        .map_err(|_| Error::Internal("negative row count in row group blob".into()))?;
    let reader = builder.with_batch_size(rows.max(1)).build()?;

    let mut batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    match batches.len() {
        0 => Ok(RecordBatch::new_empty(schema)),
        1 => Ok(batches.swap_remove(0)),
        _ => Ok(concat_batches(&schema, &batches)?),
    }
}
