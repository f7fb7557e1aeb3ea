//! Songs and Artists dimensions from the song catalog
//!
//! Both tables are deduplicated by whole row, not by primary key. A song id
//! that appears with two different titles yields two rows with the same id;
//! that disagreement is in the source and is kept.

use crate::error::Result;
use crate::transform::dedup::{distinct_rows, project_table};
use crate::transform::normalize::{artist_column_mapping, rename_columns};
use crate::types::Table;

/// Columns of the Songs dimension, in output order
pub const SONG_COLUMNS: [&str; 5] = ["song_id", "title", "artist_id", "year", "duration"];

/// Catalog columns feeding the Artists dimension
pub const ARTIST_SOURCE_COLUMNS: [&str; 5] = [
    "artist_id",
    "artist_name",
    "artist_location",
    "artist_latitude",
    "artist_longitude",
];

/// Build the Songs dimension
pub fn extract_songs(catalog: &Table) -> Result<Table> {
    let songs = project_table(catalog, &SONG_COLUMNS)?;
    let merged = songs.concat()?;
    Ok(Table::from_batch(distinct_rows(&merged)?))
}

/// Build the Artists dimension
///
/// Deduplication runs on the projected catalog columns before renaming, so
/// the result is the same either way round.
pub fn extract_artists(catalog: &Table) -> Result<Table> {
    let artists = project_table(catalog, &ARTIST_SOURCE_COLUMNS)?;
    let merged = distinct_rows(&artists.concat()?)?;
    Ok(Table::from_batch(rename_columns(
        &merged,
        &artist_column_mapping(),
    )?))
}
