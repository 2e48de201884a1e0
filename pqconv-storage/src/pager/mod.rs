//! Key/blob pager abstraction.
//!
//! Blobs are immutable once written: a container never rewrites a row group
//! in place, it stores a new blob under a fresh key and frees the old one.
//! Blobs come back as handles convertible into `bytes::Bytes`, so the Parquet
//! reader decodes a row group straight out of pager memory.

use bytes::Bytes;
use pqconv_result::{Error, Result};

use crate::types::PhysicalKey;

pub mod mem_pager;
pub use mem_pager::MemPager;

/// One write in a [`Pager::batch_put`] call.
#[derive(Clone, Debug)]
pub enum BatchPut {
    Raw { key: PhysicalKey, bytes: Bytes },
}

/// One read in a [`Pager::batch_get`] call.
#[derive(Clone, Copy, Debug)]
pub enum BatchGet {
    Raw { key: PhysicalKey },
}

#[derive(Clone, Debug)]
pub enum GetResult<B> {
    Raw { key: PhysicalKey, bytes: B },
    Missing { key: PhysicalKey },
}

pub trait Pager: Send + Sync + 'static {
    /// Converting into [`Bytes`] should share the stored buffer, not copy it.
    type Blob: AsRef<[u8]> + Into<Bytes> + Clone + Send + Sync + 'static;

    /// Reserve `n` unused keys. Keys are never handed out twice.
    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>>;

    /// One result per request, in request order.
    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>>;

    /// Store every blob, overwriting whatever a key held before.
    fn batch_put(&self, puts: &[BatchPut]) -> Result<()>;

    /// Release keys. Unknown keys are ignored.
    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()>;

    fn alloc_key(&self) -> Result<PhysicalKey> {
        self.alloc_many(1)?
            .pop()
            .ok_or_else(|| Error::Internal("pager allocated no key".into()))
    }

    fn put_raw(&self, key: PhysicalKey, bytes: Bytes) -> Result<()> {
        self.batch_put(&[BatchPut::Raw { key, bytes }])
    }

    /// Fetch a single blob, `None` when the key holds nothing.
    fn get_raw(&self, key: PhysicalKey) -> Result<Option<Self::Blob>> {
        match self.batch_get(&[BatchGet::Raw { key }])?.pop() {
            Some(GetResult::Raw { bytes, .. }) => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }
}
