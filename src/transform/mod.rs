//! Transform module
//!
//! Pure stages from raw tables to the five star-schema tables. No stage
//! touches storage; each takes tables by reference and returns new ones.
//!
//! # Stages
//!
//! - `catalog` - Songs and Artists from the song catalog
//! - `prepare_log` - NextSong filter, column renames, `start_time`
//! - `time` - Time dimension from `start_time`
//! - `users` - Users dimension, latest level per user
//! - `songplays` - Songplays fact table, catalog join and surrogate ids

pub mod catalog;
pub mod dedup;
pub mod ids;
pub mod normalize;
pub mod songplays;
pub mod time;
pub mod users;

pub use catalog::{extract_artists, extract_songs};
pub use dedup::{distinct_rows, project};
pub use ids::IdAllocator;
pub use normalize::{log_column_mapping, rename_columns, ColumnMapping};
pub use songplays::{assemble_partition, assemble_songplays, CatalogIndex, SONGPLAY_SCHEMA};
pub use time::{extract_time, with_start_time, START_TIME, TIME_SCHEMA};
pub use users::resolve_users;

use crate::error::Result;
use crate::types::{Table, TimestampZone};
use arrow::array::StringArray;
use arrow::compute::filter_record_batch;
use arrow::compute::kernels::cmp::eq;
use arrow::record_batch::RecordBatch;

/// Page value of a song play event
pub const NEXT_SONG: &str = "NextSong";

/// Keep only song play events; a null page is not a song play
pub fn filter_next_song(batch: &RecordBatch) -> Result<RecordBatch> {
    let page = batch.column(batch.schema().index_of("page")?);
    let mask = eq(page, &StringArray::new_scalar(NEXT_SONG))?;
    Ok(filter_record_batch(batch, &mask)?)
}

/// Turn raw log partitions into NextSong events with canonical column
/// names and a `start_time` column
pub fn prepare_log(log: &Table, zone: TimestampZone) -> Result<Table> {
    let mapping = log_column_mapping();
    log.map_partitions(|batch| {
        let plays = filter_next_song(batch)?;
        let renamed = rename_columns(&plays, &mapping)?;
        with_start_time(&renamed, zone)
    })
}

#[cfg(test)]
mod tests;
