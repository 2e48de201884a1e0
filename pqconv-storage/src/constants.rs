use crate::types::PhysicalKey;

/// Key of the blob listing every container in a pager.
pub const CATALOG_ROOT_PKEY: PhysicalKey = 0;
