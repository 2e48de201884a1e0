//! Identifiers and handles for stored row groups.

use std::fmt;

/// Position of a row group within its container, assigned on append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowGroupId(pub usize);

impl From<RowGroupId> for usize {
    fn from(id: RowGroupId) -> Self {
        id.0
    }
}

impl fmt::Display for RowGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rg{}", self.0)
    }
}

/// Read-side descriptor of one stored row group.
///
/// Identifies the group for a later read; it holds no decoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowGroupHandle {
    pub index: usize,
    pub row_count: usize,
}

/// Pager key of a row group blob.
pub type BlobKey = pqconv_storage::PhysicalKey;
