//! Row group reader and projector.
//!
//! Stored columns are matched to the fields of the target record type by
//! effective column name. Matched columns are decoded into their fields;
//! target fields without a stored column are set to their native default;
//! stored columns without a target field are not read.

use std::iter::FusedIterator;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use pqconv_reflect::{Record, TypeBinding, binding, check_compatible, decode_column};
use pqconv_result::{Error, Result};
use pqconv_store::{ColumnStore, RowGroupHandle, RowGroupSource};
use pqconv_types::ColumnSchema;

/// How the columns of one container map onto the fields of `R`.
pub struct Projection<R> {
    binding: Arc<TypeBinding<R>>,
    stored: ColumnSchema,
    /// `(stored column index, target field index)`
    matched: Vec<(usize, usize)>,
    /// Target fields with no stored column.
    defaulted: Vec<usize>,
}

impl<R: Record> Projection<R> {
    pub fn new(stored: ColumnSchema) -> Result<Self> {
        let binding = binding::<R>()?;
        let mut matched = Vec::new();
        let mut defaulted = Vec::new();
        for (field_idx, field) in binding.fields().iter().enumerate() {
            match stored.index_of(field.name()) {
                Some(stored_idx) => {
                    check_compatible(&stored.columns()[stored_idx], field.descriptor())?;
                    matched.push((stored_idx, field_idx));
                }
                None => defaulted.push(field_idx),
            }
        }

        let dropped: Vec<&str> = stored
            .names()
            .into_iter()
            .filter(|name| binding.field(name).is_none())
            .collect();
        tracing::debug!(
            ty = std::any::type_name::<R>(),
            matched = matched.len(),
            defaulted = ?defaulted
                .iter()
                .map(|&i| binding.fields()[i].name())
                .collect::<Vec<_>>(),
            dropped = ?dropped,
            "deserialize: projection plan"
        );

        Ok(Self {
            binding,
            stored,
            matched,
            defaulted,
        })
    }

    /// Names of target columns filled from storage, in target order.
    pub fn matched_columns(&self) -> Vec<&str> {
        self.matched
            .iter()
            .map(|&(_, field_idx)| self.binding.fields()[field_idx].name())
            .collect()
    }

    /// Names of target columns set to their default.
    pub fn defaulted_columns(&self) -> Vec<&str> {
        self.defaulted
            .iter()
            .map(|&field_idx| self.binding.fields()[field_idx].name())
            .collect()
    }

    /// Rebuild the records of one stored row group.
    pub fn decode(&self, batch: &RecordBatch) -> Result<Vec<R>> {
        let rows = batch.num_rows();
        if batch.num_columns() != self.stored.len() {
            return Err(Error::Internal(format!(
                "row group has {} columns, container schema has {}",
                batch.num_columns(),
                self.stored.len()
            )));
        }

        let mut records: Vec<R> = (0..rows).map(|_| R::default()).collect();
        let fields = self.binding.fields();

        for &field_idx in &self.defaulted {
            let field = &fields[field_idx];
            records.iter_mut().for_each(|record| field.reset(record));
        }

        for &(stored_idx, field_idx) in &self.matched {
            let field = &fields[field_idx];
            let values = decode_column(
                &self.stored.columns()[stored_idx],
                batch.column(stored_idx).as_ref(),
            )?;
            if values.len() != rows {
                return Err(Error::Internal(format!(
                    "column '{}' decoded {} values for {rows} rows",
                    field.name(),
                    values.len()
                )));
            }
            for (record, value) in records.iter_mut().zip(values) {
                field.write(record, value)?;
            }
        }
        Ok(records)
    }
}

fn open<R: Record, S: ColumnStore>(store: &S, source: &str) -> Result<(S::Reader, Projection<R>)> {
    let reader = store.open_for_read(source)?;
    let stored = ColumnSchema::from_arrow(&reader.schema())?;
    let projection = Projection::new(stored)?;
    Ok((reader, projection))
}

/// Read every row group of `source`, in order, into one sequence.
pub fn deserialize_all<R: Record, S: ColumnStore>(store: &S, source: &str) -> Result<Vec<R>> {
    let (reader, projection) = open::<R, S>(store, source)?;
    let mut records = Vec::with_capacity(reader.total_rows());
    for index in 0..reader.row_group_count() {
        let batch = reader.read_row_group(index)?;
        records.extend(projection.decode(&batch)?);
    }
    tracing::debug!(source, rows = records.len(), "deserialize: read all row groups");
    Ok(records)
}

/// Read the row group at zero-based `index`.
///
/// Fails with [`Error::IndexOutOfRange`] when `index` is negative or not
/// below the stored row group count.
pub fn deserialize_group<R: Record, S: ColumnStore>(
    store: &S,
    source: &str,
    index: i64,
) -> Result<Vec<R>> {
    let reader = store.open_for_read(source)?;
    let count = reader.row_group_count();
    // Addressing is checked before the stored columns are matched to `R`.
    let position = usize::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .ok_or(Error::IndexOutOfRange { index, count })?;
    let projection = Projection::<R>::new(ColumnSchema::from_arrow(&reader.schema())?)?;
    let batch = reader.read_row_group(position)?;
    let records = projection.decode(&batch)?;
    tracing::debug!(
        source,
        row_group = position,
        rows = records.len(),
        "deserialize: read row group"
    );
    Ok(records)
}

/// Lazily read `source` one row group at a time.
///
/// The container is opened (and its schema projected) up front; each call
/// to `next` then decodes one row group.
pub fn deserialize_groups_lazy<R: Record, S: ColumnStore>(
    store: &S,
    source: &str,
) -> Result<RowGroups<R, S::Reader>> {
    let (reader, projection) = open::<R, S>(store, source)?;
    let count = reader.row_group_count();
    Ok(RowGroups {
        reader,
        projection,
        next: 0,
        count,
    })
}

/// Iterator over the row groups of a container, yielding one `Vec<R>` per
/// group in stored order.
///
/// Single pass. It ends after the stored count, or right after yielding an
/// error. Open a new one from the store to read again.
pub struct RowGroups<R, Rd> {
    reader: Rd,
    projection: Projection<R>,
    next: usize,
    count: usize,
}

impl<R: Record, Rd: RowGroupSource> RowGroups<R, Rd> {
    pub fn row_group_count(&self) -> usize {
        self.count
    }

    /// Handle of the next row group to be read.
    pub fn peek_handle(&self) -> Option<RowGroupHandle> {
        (self.next < self.count)
            .then(|| self.reader.row_group(self.next))
            .flatten()
    }

    pub fn projection(&self) -> &Projection<R> {
        &self.projection
    }
}

impl<R: Record, Rd: RowGroupSource> Iterator for RowGroups<R, Rd> {
    type Item = Result<Vec<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let result = self
            .reader
            .read_row_group(index)
            .and_then(|batch| self.projection.decode(&batch));
        if result.is_err() {
            self.next = self.count;
        }
        Some(result)
    }

    /// Skips row groups without decoding them.
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n).min(self.count);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl<R: Record, Rd: RowGroupSource> ExactSizeIterator for RowGroups<R, Rd> {}

impl<R: Record, Rd: RowGroupSource> FusedIterator for RowGroups<R, Rd> {}
