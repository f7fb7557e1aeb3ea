//! Projection and exact-row deduplication
//!
//! Deduplication compares whole rows of the projected columns. Two rows that
//! share a key but differ in any other column both survive; only rows equal
//! in every column collapse. Nulls compare equal to nulls.

use crate::error::Result;
use crate::types::Table;
use arrow::array::UInt32Array;
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use std::collections::HashSet;

/// Keep only `columns`, in that order
pub fn project(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices = columns
        .iter()
        .map(|name| schema.index_of(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(batch.project(&indices)?)
}

/// Project every partition of a table
pub fn project_table(table: &Table, columns: &[&str]) -> Result<Table> {
    let schema = table.schema();
    let indices = columns
        .iter()
        .map(|name| schema.index_of(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let projected = std::sync::Arc::new(schema.project(&indices)?);
    let partitions = table
        .partitions()
        .iter()
        .map(|batch| Ok(batch.project(&indices)?))
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::new(projected, partitions))
}

/// Drop rows equal in every column to an earlier row
///
/// The first occurrence of each distinct row is kept and input order is
/// otherwise preserved.
pub fn distinct_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    if batch.num_rows() == 0 || batch.num_columns() == 0 {
        return Ok(batch.clone());
    }

    let fields = batch
        .schema()
        .fields()
        .iter()
        .map(|f| SortField::new(f.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields)?;
    let rows = converter.convert_columns(batch.columns())?;

    let mut seen = HashSet::with_capacity(rows.num_rows());
    let keep: Vec<u32> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| seen.insert(*row))
        .map(|(idx, _)| idx as u32)
        .collect();

    if keep.len() == batch.num_rows() {
        return Ok(batch.clone());
    }
    Ok(take_record_batch(batch, &UInt32Array::from(keep))?)
}

/// Collapse a table into one batch of distinct rows
pub fn distinct_table(table: &Table) -> Result<Table> {
    let merged = table.concat()?;
    Ok(Table::from_batch(distinct_rows(&merged)?))
}
