//! Common types used throughout songplay-lake
//!
//! This module contains the table identifiers of the star schema, the
//! partitioned `Table` container passed between stages, and small shared
//! enums.

use crate::error::Result;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Output Tables
// ============================================================================

/// The five tables of the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Songs,
    Artists,
    Users,
    Time,
    Songplays,
}

impl TableName {
    /// All tables in the order a run writes them
    pub const ALL: [TableName; 5] = [
        TableName::Songs,
        TableName::Artists,
        TableName::Users,
        TableName::Time,
        TableName::Songplays,
    ];

    /// Destination directory name under the output root
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Songs => "songs",
            TableName::Artists => "artists",
            TableName::Users => "users",
            TableName::Time => "time",
            TableName::Songplays => "songplays",
        }
    }

    /// Hive partition columns, outermost first
    pub fn partition_columns(self) -> &'static [&'static str] {
        match self {
            TableName::Songs => &["year", "artist_id"],
            TableName::Time | TableName::Songplays => &["year", "month"],
            TableName::Artists | TableName::Users => &[],
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Timestamp Zone
// ============================================================================

/// Zone used when formatting event timestamps as `start_time` strings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TimestampZone {
    /// The host's local zone
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

// ============================================================================
// Table
// ============================================================================

/// A schema plus an ordered list of record batches.
///
/// Each batch is one partition of work: a source file on read, a worker's
/// slice during assembly. Stages never mutate a table in place.
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    partitions: Vec<RecordBatch>,
}

impl Table {
    /// Create a table from batches sharing `schema`
    pub fn new(schema: SchemaRef, partitions: Vec<RecordBatch>) -> Self {
        Self { schema, partitions }
    }

    /// Create a single-partition table
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            partitions: vec![batch],
        }
    }

    /// Create a table with no rows
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            partitions: Vec::new(),
        }
    }

    /// Table schema
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Partitions in order
    pub fn partitions(&self) -> &[RecordBatch] {
        &self.partitions
    }

    /// Number of partitions
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total row count across partitions
    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(RecordBatch::num_rows).sum()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Collapse all partitions into one batch
    pub fn concat(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.partitions)?)
    }

    /// Apply a fallible stage to every partition
    ///
    /// A table without partitions still runs the stage once on an empty
    /// batch so the output schema is the stage's, not the input's.
    pub fn map_partitions<F>(&self, f: F) -> Result<Table>
    where
        F: Fn(&RecordBatch) -> Result<RecordBatch>,
    {
        if self.partitions.is_empty() {
            let empty = f(&RecordBatch::new_empty(self.schema()))?;
            return Ok(Table::empty(empty.schema()));
        }
        let partitions = self
            .partitions
            .iter()
            .map(f)
            .collect::<Result<Vec<_>>>()?;
        Ok(Table::new(partitions[0].schema(), partitions))
    }
}
