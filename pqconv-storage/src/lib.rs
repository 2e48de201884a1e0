//! Blob storage for pqconv containers.
//!
//! A [`Pager`](pager::Pager) hands out opaque 64-bit keys and stores
//! immutable byte blobs under them. Higher layers keep one blob per row group
//! plus a catalog blob at [`CATALOG_ROOT_PKEY`](constants::CATALOG_ROOT_PKEY).

#![forbid(unsafe_code)]

pub mod constants;
pub mod pager;
pub mod types;

pub use pager::{BatchGet, BatchPut, GetResult, MemPager, Pager};
pub use types::PhysicalKey;
