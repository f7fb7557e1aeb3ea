//! Output module
//!
//! Persists star-schema tables as Hive-partitioned Parquet.
//!
//! # Overview
//!
//! This module provides:
//! - In-memory Parquet encoding (`encode_parquet`)
//! - Splitting a batch by partition column values (`split_by_partition`)
//! - The `TableSink` trait with object-store and in-memory implementations

mod partition;
mod sink;
mod writer;

pub use partition::{
    escape_partition_value, split_by_partition, PartitionKey, HIVE_DEFAULT_PARTITION,
};
pub use sink::{MemorySink, ObjectStoreSink, TableSink, WriteSpec, WriteSummary, PART_FILE};
pub use writer::{decode_parquet, encode_parquet, writer_properties};
