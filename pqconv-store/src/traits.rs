//! Column-store interface consumed by the row group writer and reader.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use pqconv_result::Result;

use crate::types::{RowGroupHandle, RowGroupId};
use crate::writer::WriterConfig;

/// A store of named row-group containers.
pub trait ColumnStore {
    type Writer: RowGroupSink;
    type Reader: RowGroupSource;

    /// Start a new container at `destination`.
    ///
    /// An existing container at the same name stays readable until the
    /// writer is finished, at which point it is replaced.
    fn open_for_write(
        &self,
        destination: &str,
        schema: SchemaRef,
        config: &WriterConfig,
    ) -> Result<Self::Writer>;

    /// Continue an existing container. Fails with
    /// [`Error::NotFound`](pqconv_result::Error::NotFound) when `destination`
    /// holds nothing.
    fn open_for_append(&self, destination: &str, config: &WriterConfig) -> Result<Self::Writer>;

    /// Open a read snapshot of the container at `source`.
    fn open_for_read(&self, source: &str) -> Result<Self::Reader>;
}

/// Write handle of one container.
///
/// Row groups are encoded and stored as they are appended but only become
/// part of the container on [`finish`](RowGroupSink::finish). A sink dropped
/// before that leaves the container as it was.
pub trait RowGroupSink {
    /// Schema every appended batch must carry.
    fn schema(&self) -> SchemaRef;

    /// Row groups the container will hold once finished.
    fn row_group_count(&self) -> usize;

    fn append_row_group(&mut self, batch: RecordBatch) -> Result<RowGroupId>;

    /// Commit the appended row groups. Returns the container's row group
    /// count.
    fn finish(self) -> Result<usize>
    where
        Self: Sized;
}

/// Read handle of one container.
pub trait RowGroupSource {
    fn schema(&self) -> SchemaRef;

    fn row_group_count(&self) -> usize;

    /// Handle of the row group at `index`, without decoding it.
    fn row_group(&self, index: usize) -> Option<RowGroupHandle>;

    /// Decode the row group at `index`. Fails with
    /// [`Error::IndexOutOfRange`](pqconv_result::Error::IndexOutOfRange) past
    /// the stored count.
    fn read_row_group(&self, index: usize) -> Result<RecordBatch>;

    fn row_groups(&self) -> Vec<RowGroupHandle> {
        (0..self.row_group_count())
            .filter_map(|index| self.row_group(index))
            .collect()
    }

    fn total_rows(&self) -> usize {
        self.row_groups().iter().map(|rg| rg.row_count).sum()
    }
}
