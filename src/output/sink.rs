//! Table sinks
//!
//! A `TableSink` persists one whole table per call. `ObjectStoreSink` writes
//! Hive-partitioned Parquet under a `StorageLocation`; `MemorySink` keeps
//! tables in memory for tests.

use super::partition::split_by_partition;
use super::writer::encode_parquet;
use crate::config::OutputSettings;
use crate::error::{Error, Result, ResultExt};
use crate::storage::StorageLocation;
use crate::types::{Table, TableName};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Name of the single data file in each partition directory
pub const PART_FILE: &str = "part-00000.parquet";

// ============================================================================
// Write Spec
// ============================================================================

/// Destination of one table write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSpec {
    /// Table being written; also its directory under the output root
    pub table: TableName,
    /// Hive partition columns, outermost first
    pub partition_by: Vec<String>,
}

impl WriteSpec {
    /// Spec using the table's standard partition columns
    pub fn for_table(table: TableName) -> Self {
        Self {
            table,
            partition_by: table
                .partition_columns()
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }

    /// Check if the table is written unpartitioned
    pub fn is_partitioned(&self) -> bool {
        !self.partition_by.is_empty()
    }
}

/// What a table write produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Table written
    pub table: TableName,
    /// Rows written
    pub rows: usize,
    /// Partition directories written (1 for an unpartitioned table)
    pub partitions: usize,
    /// Keys of the files written
    pub files: Vec<String>,
    /// Objects removed before writing
    pub replaced: usize,
}

// ============================================================================
// Sink Trait
// ============================================================================

/// Persists tables with overwrite semantics
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Write `table`, replacing existing data at the partitions it produces
    async fn write_table(&self, table: &Table, spec: &WriteSpec) -> Result<WriteSummary>;
}

// ============================================================================
// Object Store Sink
// ============================================================================

/// Writes Parquet files into an object store location
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    location: StorageLocation,
    settings: OutputSettings,
}

impl ObjectStoreSink {
    /// Create a sink with default Parquet settings
    pub fn new(location: StorageLocation) -> Self {
        Self {
            location,
            settings: OutputSettings::default(),
        }
    }

    /// Use the configured codec and row group size
    #[must_use]
    pub fn with_settings(mut self, settings: OutputSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Output root
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }
}

#[async_trait]
impl TableSink for ObjectStoreSink {
    async fn write_table(&self, table: &Table, spec: &WriteSpec) -> Result<WriteSummary> {
        let name = spec.table.as_str();

        let batch = table.concat().write_context(name)?;
        let columns: Vec<&str> = spec.partition_by.iter().map(String::as_str).collect();
        let parts = split_by_partition(&batch, &columns).write_context(name)?;

        let mut summary = WriteSummary {
            table: spec.table,
            rows: batch.num_rows(),
            partitions: 0,
            files: Vec::with_capacity(parts.len()),
            replaced: 0,
        };

        if !spec.is_partitioned() {
            summary.replaced += self.location.delete_prefix(name).await.write_context(name)?;
        }

        for (key, part) in parts {
            let dir = if key.is_root() {
                name.to_string()
            } else {
                format!("{name}/{}", key.dir())
            };
            if !key.is_root() {
                summary.replaced += self.location.delete_prefix(&dir).await.write_context(name)?;
            }

            let data = encode_parquet(&part.schema(), std::slice::from_ref(&part), &self.settings)
                .write_context(name)?;
            let file = self
                .location
                .put(&format!("{dir}/{PART_FILE}"), data)
                .await
                .write_context(name)?;
            debug!("Wrote {} rows to {}", part.num_rows(), file);

            summary.partitions += 1;
            summary.files.push(file);
        }

        Ok(summary)
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// Keeps written tables in memory, replacing on each write
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<TableName, Table>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Last table written under `name`
    pub fn table(&self, name: TableName) -> Option<Table> {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| tables.get(&name).cloned())
    }

    /// Names of the tables written so far
    pub fn written(&self) -> Vec<TableName> {
        let tables = match self.tables.lock() {
            Ok(tables) => tables,
            Err(_) => return Vec::new(),
        };
        TableName::ALL
            .into_iter()
            .filter(|name| tables.contains_key(name))
            .collect()
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn write_table(&self, table: &Table, spec: &WriteSpec) -> Result<WriteSummary> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| Error::write(spec.table.as_str(), "memory sink lock poisoned"))?;
        tables.insert(spec.table, table.clone());
        Ok(WriteSummary {
            table: spec.table,
            rows: table.num_rows(),
            partitions: table.num_partitions(),
            files: Vec::new(),
            replaced: 0,
        })
    }
}
