//! Pager-backed [`ColumnStore`] implementation.

use std::sync::{Arc, RwLock};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use pqconv_result::{Error, Result};
use pqconv_storage::constants::CATALOG_ROOT_PKEY;
use pqconv_storage::pager::Pager;

use crate::catalog::{ContainerCatalog, ContainerMetadata, RowGroupRef};
use crate::reader::read_row_group_from_memory;
use crate::traits::{ColumnStore, RowGroupSink, RowGroupSource};
use crate::types::{BlobKey, RowGroupHandle, RowGroupId};
use crate::writer::{WriterConfig, write_row_group_to_memory};

/// Named row-group containers kept as Parquet blobs in a pager.
///
/// Each container owns an IPC-encoded schema and an ordered list of row
/// group blobs. The catalog listing every container lives at the pager's
/// root key and is rewritten whenever a writer finishes or a container is
/// dropped.
///
/// Concurrent writers to the *same* container are not coordinated; callers
/// must serialize them. A reader keeps the row group list it opened with,
/// but replacing or dropping the container frees those blobs: reads through
/// an older reader then fail with [`Error::Internal`]. Callers must not
/// replace or drop a container while readers of it are in use.
pub struct PagerStore<P: Pager> {
    pager: Arc<P>,
    catalog: Arc<RwLock<ContainerCatalog>>,
}

impl<P: Pager> Clone for PagerStore<P> {
    fn clone(&self) -> Self {
        Self {
            pager: Arc::clone(&self.pager),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<P: Pager> PagerStore<P> {
    /// Open the store kept in `pager`, creating an empty catalog on first
    /// use.
    pub fn open(pager: Arc<P>) -> Result<Self> {
        let catalog = match pager.get_raw(CATALOG_ROOT_PKEY)? {
            Some(bytes) => ContainerCatalog::from_bytes(bytes.as_ref())?,
            None => {
                let catalog = ContainerCatalog::new();
                save_catalog(pager.as_ref(), &catalog)?;
                catalog
            }
        };
        tracing::debug!(
            containers = catalog.containers.len(),
            "PagerStore: opened catalog"
        );
        Ok(Self {
            pager,
            catalog: Arc::new(RwLock::new(catalog)),
        })
    }

    pub fn pager(&self) -> &Arc<P> {
        &self.pager
    }

    /// Names of all containers, sorted.
    pub fn list_containers(&self) -> Vec<String> {
        self.catalog.read().expect("catalog lock poisoned").names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalog
            .read()
            .expect("catalog lock poisoned")
            .contains(name)
    }

    /// Copy of a container's catalog entry.
    pub fn container_metadata(&self, name: &str) -> Result<ContainerMetadata> {
        self.catalog
            .read()
            .expect("catalog lock poisoned")
            .get(name)
            .cloned()
    }

    /// Remove a container and free its row group blobs.
    pub fn drop_container(&self, name: &str) -> Result<()> {
        let metadata = {
            let mut catalog = self.catalog.write().expect("catalog lock poisoned");
            let metadata = catalog.remove(name)?;
            if let Err(e) = save_catalog(self.pager.as_ref(), &catalog) {
                catalog.put(name.to_owned(), metadata);
                return Err(e);
            }
            metadata
        };
        let keys = metadata.blob_keys();
        if !keys.is_empty() {
            self.pager.free_many(&keys)?;
        }
        tracing::debug!(
            container = name,
            row_groups = keys.len(),
            "PagerStore: dropped container"
        );
        Ok(())
    }
}

fn save_catalog<P: Pager>(pager: &P, catalog: &ContainerCatalog) -> Result<()> {
    pager.put_raw(CATALOG_ROOT_PKEY, Bytes::from(catalog.to_bytes()))
}

impl<P: Pager> ColumnStore for PagerStore<P> {
    type Writer = ContainerWriter<P>;
    type Reader = ContainerReader<P>;

    fn open_for_write(
        &self,
        destination: &str,
        schema: SchemaRef,
        config: &WriterConfig,
    ) -> Result<Self::Writer> {
        let staged = ContainerMetadata::new(&schema)?;
        tracing::debug!(
            container = destination,
            columns = schema.fields().len(),
            compression = ?config.compression,
            "PagerStore: open for write"
        );
        Ok(ContainerWriter {
            store: self.clone(),
            name: destination.to_owned(),
            schema,
            config: config.clone(),
            mode: WriteMode::Replace(staged),
            base_row_groups: 0,
            pending: Vec::new(),
            finished: false,
        })
    }

    fn open_for_append(&self, destination: &str, config: &WriterConfig) -> Result<Self::Writer> {
        let (schema, base_row_groups) = {
            let catalog = self.catalog.read().expect("catalog lock poisoned");
            let metadata = catalog.get(destination)?;
            (metadata.schema()?, metadata.row_group_count())
        };
        tracing::debug!(
            container = destination,
            existing_row_groups = base_row_groups,
            "PagerStore: open for append"
        );
        Ok(ContainerWriter {
            store: self.clone(),
            name: destination.to_owned(),
            schema,
            config: config.clone(),
            mode: WriteMode::Append,
            base_row_groups,
            pending: Vec::new(),
            finished: false,
        })
    }

    fn open_for_read(&self, source: &str) -> Result<Self::Reader> {
        let metadata = self.container_metadata(source)?;
        let schema = metadata.schema()?;
        tracing::debug!(
            container = source,
            row_groups = metadata.row_group_count(),
            rows = metadata.total_row_count,
            "PagerStore: open for read"
        );
        Ok(ContainerReader {
            pager: Arc::clone(&self.pager),
            name: source.to_owned(),
            schema,
            row_groups: metadata.row_groups,
        })
    }
}

enum WriteMode {
    /// New container; replaces any previous one on finish.
    Replace(ContainerMetadata),
    Append,
}

/// Write handle returned by [`PagerStore`].
pub struct ContainerWriter<P: Pager> {
    store: PagerStore<P>,
    name: String,
    schema: SchemaRef,
    config: WriterConfig,
    mode: WriteMode,
    base_row_groups: usize,
    /// Blobs stored but not yet referenced by the catalog.
    pending: Vec<RowGroupRef>,
    finished: bool,
}

impl<P: Pager> ContainerWriter<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn pending_keys(&self) -> Vec<BlobKey> {
        self.pending.iter().map(|rg| rg.physical_key).collect()
    }

    fn commit(&self) -> Result<usize> {
        let pager = self.store.pager.as_ref();
        let mut catalog = self.store.catalog.write().expect("catalog lock poisoned");

        match &self.mode {
            WriteMode::Replace(staged) => {
                let mut metadata = staged.clone();
                metadata.push_row_groups(self.pending.iter().copied());
                let count = metadata.row_group_count();
                let previous = catalog.put(self.name.clone(), metadata);
                if let Err(e) = save_catalog(pager, &catalog) {
                    match previous {
                        Some(previous) => {
                            catalog.put(self.name.clone(), previous);
                        }
                        None => {
                            let _ = catalog.remove(&self.name);
                        }
                    }
                    return Err(e);
                }
                drop(catalog);
                if let Some(previous) = previous {
                    // The new entry is committed from here on; a failed free
                    // only leaks the old blobs.
                    let stale = previous.blob_keys();
                    if !stale.is_empty()
                        && let Err(e) = pager.free_many(&stale)
                    {
                        tracing::warn!(
                            container = %self.name,
                            error = %e,
                            "PagerStore: failed to free replaced row groups"
                        );
                    }
                    tracing::debug!(
                        container = %self.name,
                        freed_row_groups = stale.len(),
                        "PagerStore: replaced container"
                    );
                }
                Ok(count)
            }
            WriteMode::Append => {
                let expected = self.schema.clone();
                let metadata = catalog.get_mut(&self.name).map_err(|_| {
                    Error::SchemaMismatch(format!(
                        "container '{}' was dropped during the append",
                        self.name
                    ))
                })?;
                if metadata.schema()? != expected {
                    return Err(Error::SchemaMismatch(format!(
                        "container '{}' changed schema during the append",
                        self.name
                    )));
                }
                let base = metadata.row_group_count();
                metadata.push_row_groups(self.pending.iter().copied());
                let count = metadata.row_group_count();
                if let Err(e) = save_catalog(pager, &catalog) {
                    if let Ok(metadata) = catalog.get_mut(&self.name) {
                        metadata.truncate_row_groups(base);
                    }
                    return Err(e);
                }
                Ok(count)
            }
        }
    }
}

impl<P: Pager> RowGroupSink for ContainerWriter<P> {
    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn row_group_count(&self) -> usize {
        self.base_row_groups + self.pending.len()
    }

    fn append_row_group(&mut self, batch: RecordBatch) -> Result<RowGroupId> {
        if batch.schema().fields() != self.schema.fields() {
            return Err(Error::SchemaMismatch(format!(
                "row group for '{}' does not carry the container schema",
                self.name
            )));
        }
        let bytes = write_row_group_to_memory(&batch, &self.config)?;
        let len = bytes.len();
        let key = self.store.pager.alloc_key()?;
        self.store.pager.put_raw(key, Bytes::from(bytes))?;

        self.pending.push(RowGroupRef {
            physical_key: key,
            row_count: batch.num_rows() as u64,
        });
        let id = RowGroupId(self.row_group_count() - 1);
        tracing::trace!(
            container = %self.name,
            row_group = %id,
            rows = batch.num_rows(),
            bytes = len,
            key,
            "PagerStore: stored row group"
        );
        Ok(id)
    }

    fn finish(mut self) -> Result<usize> {
        let count = self.commit()?;
        self.finished = true;
        tracing::debug!(
            container = %self.name,
            added_row_groups = self.pending.len(),
            row_groups = count,
            "PagerStore: committed container"
        );
        Ok(count)
    }
}

impl<P: Pager> Drop for ContainerWriter<P> {
    fn drop(&mut self) {
        if self.finished || self.pending.is_empty() {
            return;
        }
        let keys = self.pending_keys();
        if let Err(e) = self.store.pager.free_many(&keys) {
            tracing::warn!(
                container = %self.name,
                error = %e,
                "PagerStore: failed to free uncommitted row groups"
            );
        } else {
            tracing::debug!(
                container = %self.name,
                row_groups = keys.len(),
                "PagerStore: discarded uncommitted row groups"
            );
        }
    }
}

/// Read handle returned by [`PagerStore`].
///
/// Appends made after opening are not visible. A replace or drop of the
/// container invalidates the handle (see [`PagerStore`]).
pub struct ContainerReader<P: Pager> {
    pager: Arc<P>,
    name: String,
    schema: SchemaRef,
    row_groups: Vec<RowGroupRef>,
}

impl<P: Pager> ContainerReader<P> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<P: Pager> RowGroupSource for ContainerReader<P> {
    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    fn row_group(&self, index: usize) -> Option<RowGroupHandle> {
        self.row_groups.get(index).map(|rg| RowGroupHandle {
            index,
            row_count: rg.row_count as usize,
        })
    }

    fn read_row_group(&self, index: usize) -> Result<RecordBatch> {
        let rg = self
            .row_groups
            .get(index)
            .ok_or_else(|| Error::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                count: self.row_groups.len(),
            })?;
        let blob = self.pager.get_raw(rg.physical_key)?.ok_or_else(|| {
            Error::Internal(format!(
                "row group {index} of '{}' missing from pager (key {})",
                self.name, rg.physical_key
            ))
        })?;
        let batch = read_row_group_from_memory(blob.into())?;
        if batch.num_rows() as u64 != rg.row_count {
            return Err(Error::Internal(format!(
                "row group {index} of '{}' holds {} rows, catalog says {}",
                self.name,
                batch.num_rows(),
                rg.row_count
            )));
        }
        tracing::trace!(
            container = %self.name,
            row_group = index,
            rows = batch.num_rows(),
            "PagerStore: read row group"
        );
        Ok(batch)
    }
}
