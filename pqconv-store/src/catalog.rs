//! Persistent catalog of named containers and their row groups.

use std::io::Cursor;

use arrow::datatypes::SchemaRef;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use pqconv_result::{Error, Result};
use rustc_hash::FxHashMap;

use crate::types::{BlobKey, RowGroupHandle};

/// Reference to one row group blob stored in the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct RowGroupRef {
    /// Pager key of the Parquet blob.
    pub physical_key: BlobKey,
    pub row_count: u64,
}

/// Schema and ordered row groups of one container.
#[derive(Debug, Clone, bitcode::Encode, bitcode::Decode)]
pub struct ContainerMetadata {
    /// Arrow schema as IPC bytes.
    pub schema_bytes: Vec<u8>,
    /// Row groups in append order.
    pub row_groups: Vec<RowGroupRef>,
    pub total_row_count: u64,
}

impl ContainerMetadata {
    pub fn new(schema: &SchemaRef) -> Result<Self> {
        let mut schema_bytes = Vec::new();
        {
            let mut writer = FileWriter::try_new(&mut schema_bytes, schema.as_ref())?;
            writer.finish()?;
        }
        Ok(Self {
            schema_bytes,
            row_groups: Vec::new(),
            total_row_count: 0,
        })
    }

    pub fn schema(&self) -> Result<SchemaRef> {
        let reader = FileReader::try_new(Cursor::new(&self.schema_bytes), None)?;
        Ok(reader.schema())
    }

    pub fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    pub fn handle(&self, index: usize) -> Option<RowGroupHandle> {
        self.row_groups.get(index).map(|rg| RowGroupHandle {
            index,
            row_count: rg.row_count as usize,
        })
    }

    pub fn push_row_groups(&mut self, refs: impl IntoIterator<Item = RowGroupRef>) {
        for rg in refs {
            self.total_row_count += rg.row_count;
            self.row_groups.push(rg);
        }
    }

    /// Drop every row group past the first `len`, returning the removed refs.
    pub fn truncate_row_groups(&mut self, len: usize) -> Vec<RowGroupRef> {
        let removed: Vec<_> = self.row_groups.drain(len.min(self.row_groups.len())..).collect();
        self.total_row_count -= removed.iter().map(|rg| rg.row_count).sum::<u64>();
        removed
    }

    pub fn blob_keys(&self) -> Vec<BlobKey> {
        self.row_groups.iter().map(|rg| rg.physical_key).collect()
    }
}

/// Catalog mapping container names to their metadata.
///
/// Persisted as one bitcode blob at the pager's reserved root key.
#[derive(Debug, Clone, Default, bitcode::Encode, bitcode::Decode)]
pub struct ContainerCatalog {
    pub(crate) containers: FxHashMap<String, ContainerMetadata>,
}

impl ContainerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bitcode::decode(bytes).map_err(|e| Error::Internal(format!("bitcode decode failed: {e}")))
    }

    pub fn get(&self, name: &str) -> Result<&ContainerMetadata> {
        self.containers.get(name).ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut ContainerMetadata> {
        self.containers.get_mut(name).ok_or(Error::NotFound)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    /// Insert or replace a container, returning the previous metadata.
    pub fn put(&mut self, name: String, metadata: ContainerMetadata) -> Option<ContainerMetadata> {
        self.containers.insert(name, metadata)
    }

    pub fn remove(&mut self, name: &str) -> Result<ContainerMetadata> {
        self.containers.remove(name).ok_or(Error::NotFound)
    }

    /// Container names in lexical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.containers.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
