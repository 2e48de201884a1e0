use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use pqconv_result::{Error, Result};
use rustc_hash::FxHashMap;

use super::{BatchGet, BatchPut, GetResult, Pager};
use crate::constants::CATALOG_ROOT_PKEY;
use crate::types::PhysicalKey;

/// Pager holding every blob in process memory.
///
/// Key allocation starts after [`CATALOG_ROOT_PKEY`], so the catalog key is
/// only ever written explicitly. Blobs are shared, not copied, on read.
pub struct MemPager {
    next_key: AtomicU64,
    blobs: RwLock<FxHashMap<PhysicalKey, Bytes>>,
}

impl Default for MemPager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemPager {
    pub fn new() -> Self {
        Self {
            next_key: AtomicU64::new(CATALOG_ROOT_PKEY + 1),
            blobs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Number of live blobs, the catalog blob included.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().expect("MemPager lock poisoned").len()
    }

    pub fn total_bytes(&self) -> usize {
        self.blobs
            .read()
            .expect("MemPager lock poisoned")
            .values()
            .map(Bytes::len)
            .sum()
    }
}

impl Pager for MemPager {
    type Blob = Bytes;

    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>> {
        let n = n as u64;
        let start = self
            .next_key
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                next.checked_add(n)
            })
            .map_err(|_| Error::Internal("MemPager key space exhausted".into()))?;
        Ok((start..start + n).collect())
    }

    fn batch_put(&self, puts: &[BatchPut]) -> Result<()> {
        let mut blobs = self.blobs.write().expect("MemPager lock poisoned");
        for BatchPut::Raw { key, bytes } in puts {
            tracing::trace!(key, len = bytes.len(), "MemPager: put");
            blobs.insert(*key, bytes.clone());
        }
        Ok(())
    }

    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>> {
        let blobs = self.blobs.read().expect("MemPager lock poisoned");
        Ok(gets
            .iter()
            .map(|&BatchGet::Raw { key }| match blobs.get(&key) {
                Some(bytes) => GetResult::Raw {
                    key,
                    bytes: bytes.clone(),
                },
                None => GetResult::Missing { key },
            })
            .collect())
    }

    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()> {
        let mut blobs = self.blobs.write().expect("MemPager lock poisoned");
        let freed = keys.iter().filter(|&&k| blobs.remove(&k).is_some()).count();
        tracing::trace!(requested = keys.len(), freed, "MemPager: free");
        Ok(())
    }
}
