//! Parquet encoding
//!
//! Encodes Arrow RecordBatches into in-memory Parquet files, ready to be put
//! into an object store in one request.

use crate::config::{OutputSettings, ParquetCompression};
use crate::error::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;

fn codec(compression: ParquetCompression) -> Compression {
    match compression {
        ParquetCompression::Snappy => Compression::SNAPPY,
        ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
        ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
    }
}

/// Writer properties for the configured codec and row group size
pub fn writer_properties(settings: &OutputSettings) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(codec(settings.compression))
        .set_max_row_group_size(settings.row_group_size)
        .build()
}

/// Encode batches sharing `schema` into one Parquet file
///
/// An empty slice produces a valid file with the schema and no rows.
pub fn encode_parquet(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    settings: &OutputSettings,
) -> Result<Bytes> {
    let mut writer = ArrowWriter::try_new(
        Vec::new(),
        schema.clone(),
        Some(writer_properties(settings)),
    )
    .map_err(|e| Error::Other(format!("Failed to create Parquet writer: {e}")))?;

    for batch in batches {
        writer.write(batch)?;
    }

    let buffer = writer.into_inner()?;
    Ok(Bytes::from(buffer))
}

/// Decode a Parquet file back into batches
pub fn decode_parquet(data: Bytes) -> Result<Vec<RecordBatch>> {
    let reader =
        parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(data)?.build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}
