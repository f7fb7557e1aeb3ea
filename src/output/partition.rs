//! Hive-style partition splitting
//!
//! A partitioned table is written as one directory per distinct combination
//! of partition column values, e.g. `year=2018/month=11/`. The partition
//! columns live in the path and are removed from the file contents.

use crate::error::Result;
use arrow::array::{Array, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use std::collections::HashMap;

/// Directory value used for a null or empty partition value
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// One partition's column values, outermost first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    parts: Vec<(String, String)>,
}

impl PartitionKey {
    /// Key of an unpartitioned table
    pub fn root() -> Self {
        Self { parts: Vec::new() }
    }

    /// Add a column value
    #[must_use]
    pub fn with_part(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((column.into(), value.into()));
        self
    }

    /// Check if this is the unpartitioned root
    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Relative directory, e.g. `year=2018/month=11`
    pub fn dir(&self) -> String {
        self.parts
            .iter()
            .map(|(column, value)| format!("{column}={}", escape_partition_value(value)))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Escape characters that would break a `column=value` path segment
pub fn escape_partition_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '/' | '\\' | '=' | '%' | ':' | '#' | '?' | '"' | '\'' | '*' | '[' | ']' | '^' => {
                escaped.push_str(&format!("%{:02X}", ch as u32));
            }
            c if c.is_control() => escaped.push_str(&format!("%{:02X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Split a batch into per-partition batches without the partition columns
///
/// Partitions come back in order of first appearance; row order inside each
/// partition is preserved. Null and empty values both map to
/// [`HIVE_DEFAULT_PARTITION`]. With no partition columns the whole batch is
/// returned under the root key.
pub fn split_by_partition(
    batch: &RecordBatch,
    columns: &[&str],
) -> Result<Vec<(PartitionKey, RecordBatch)>> {
    if columns.is_empty() {
        return Ok(vec![(PartitionKey::root(), batch.clone())]);
    }

    let schema = batch.schema();
    let key_indices = columns
        .iter()
        .map(|name| schema.index_of(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let data_indices: Vec<usize> = (0..schema.fields().len())
        .filter(|idx| !key_indices.contains(idx))
        .collect();
    let data = batch.project(&data_indices)?;

    let mut order: Vec<PartitionKey> = Vec::new();
    let mut rows: HashMap<PartitionKey, Vec<u32>> = HashMap::new();

    for row in 0..batch.num_rows() {
        let mut key = PartitionKey::root();
        for (&idx, name) in key_indices.iter().zip(columns) {
            let column = batch.column(idx);
            let value = if column.is_valid(row) {
                Some(array_value_to_string(column, row)?)
            } else {
                None
            };
            let value = value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| HIVE_DEFAULT_PARTITION.to_string());
            key = key.with_part(*name, value);
        }
        rows.entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row as u32);
    }

    order
        .into_iter()
        .map(|key| {
            let indices = UInt32Array::from(rows.remove(&key).unwrap_or_default());
            let part = take_record_batch(&data, &indices)?;
            Ok((key, part))
        })
        .collect()
}
