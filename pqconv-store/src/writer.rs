//! Row group encoding.

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use pqconv_result::Result;

/// Compression codec applied to row group pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    None,
    #[default]
    Snappy,
    Gzip,
    Zstd,
}

impl CompressionMethod {
    fn to_parquet(self) -> Compression {
        match self {
            CompressionMethod::None => Compression::UNCOMPRESSED,
            CompressionMethod::Snappy => Compression::SNAPPY,
            CompressionMethod::Gzip => Compression::GZIP(GzipLevel::default()),
            CompressionMethod::Zstd => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

/// Encoding options for row group blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    pub compression: CompressionMethod,
    pub enable_dictionary: bool,
    /// Page size hint in bytes; `None` keeps the Parquet default.
    pub data_page_size_limit: Option<usize>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::default(),
            enable_dictionary: true,
            data_page_size_limit: None,
        }
    }
}

impl WriterConfig {
    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.enable_dictionary = enabled;
        self
    }

    pub fn with_data_page_size_limit(mut self, limit: usize) -> Self {
        self.data_page_size_limit = Some(limit);
        self
    }

    /// Parquet properties for a blob holding exactly `rows` rows.
    fn properties(&self, rows: usize) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(self.compression.to_parquet())
            .set_dictionary_enabled(self.enable_dictionary)
            // One physical row group per blob.
            .set_max_row_group_size(rows.max(1));
        if let Some(limit) = self.data_page_size_limit {
            builder = builder.set_data_page_size_limit(limit);
        }
        builder.build()
    }
}

/// Encode `batch` as a self-contained single-row-group Parquet file.
pub fn write_row_group_to_memory(batch: &RecordBatch, config: &WriterConfig) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let props = config.properties(batch.num_rows());
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(buffer)
}
