//! Options for [`serialize`](crate::serialize).

use pqconv_store::{CompressionMethod, WriterConfig};
use pqconv_types::ColumnSchema;

/// Rows per row group when none is configured.
pub const DEFAULT_ROW_GROUP_SIZE: usize = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct SerializeOptions {
    /// Schema to write with. `None` reflects it from the record type.
    pub schema: Option<ColumnSchema>,
    /// Maximum records per row group; the last group may be smaller.
    pub row_group_size: usize,
    pub compression: CompressionMethod,
    /// Dictionary-encode column pages.
    pub dictionary: bool,
    /// Page size hint in bytes; `None` keeps the Parquet default.
    pub data_page_size_limit: Option<usize>,
    /// Add row groups to an existing container instead of replacing it.
    pub append: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            schema: None,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            compression: CompressionMethod::default(),
            dictionary: true,
            data_page_size_limit: None,
            append: false,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: ColumnSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_row_group_size(mut self, row_group_size: usize) -> Self {
        self.row_group_size = row_group_size;
        self
    }

    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary = enabled;
        self
    }

    pub fn with_data_page_size_limit(mut self, limit: usize) -> Self {
        self.data_page_size_limit = Some(limit);
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub(crate) fn writer_config(&self) -> WriterConfig {
        let config = WriterConfig::default()
            .with_compression(self.compression)
            .with_dictionary(self.dictionary);
        match self.data_page_size_limit {
            Some(limit) => config.with_data_page_size_limit(limit),
            None => config,
        }
    }
}
