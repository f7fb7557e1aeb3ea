//! Songplays fact table
//!
//! Every NextSong event becomes at least one songplay. Events are matched to
//! the catalog on exact `(song, artist)` = `(title, artist_name)` string
//! equality: no case folding, no trimming. An event without a match keeps
//! null `song_id` and `artist_id`; an event matching several catalog rows
//! yields one songplay per match.

use crate::error::Result;
use crate::transform::dedup::{distinct_table, project, project_table};
use crate::transform::ids::IdAllocator;
use crate::transform::time::{year_month, START_TIME};
use crate::types::Table;
use arrow::array::{Array, ArrayRef, AsArray, Int64Array, StringArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use futures::future::try_join_all;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Schema of the Songplays fact table
pub static SONGPLAY_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("songplay_id", DataType::Int64, false),
        Field::new(START_TIME, DataType::Utf8, true),
        Field::new("user_id", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
        Field::new("year", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
    ]))
});

/// Event columns carried into the fact table unchanged
const CARRIED: [&str; 6] = [
    START_TIME,
    "user_id",
    "level",
    "session_id",
    "location",
    "user_agent",
];

type Match = (Option<String>, Option<String>);

/// Catalog lookup: title → artist name → (song_id, artist_id) matches
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    by_title: HashMap<String, HashMap<String, Vec<Match>>>,
    entries: usize,
}

impl CatalogIndex {
    /// Index the distinct (artist_id, artist_name, song_id, title) rows
    pub fn build(catalog: &Table) -> Result<Self> {
        let projected = project_table(catalog, &["artist_id", "artist_name", "song_id", "title"])?;
        let distinct = distinct_table(&projected)?.concat()?;

        let artist_ids = distinct.column(0).as_string::<i32>();
        let artist_names = distinct.column(1).as_string::<i32>();
        let song_ids = distinct.column(2).as_string::<i32>();
        let titles = distinct.column(3).as_string::<i32>();

        let mut index = Self::default();
        for row in 0..distinct.num_rows() {
            // Null keys can never satisfy an equality join.
            if titles.is_null(row) || artist_names.is_null(row) {
                continue;
            }
            index
                .by_title
                .entry(titles.value(row).to_string())
                .or_default()
                .entry(artist_names.value(row).to_string())
                .or_default()
                .push((
                    song_ids.is_valid(row).then(|| song_ids.value(row).to_string()),
                    artist_ids.is_valid(row).then(|| artist_ids.value(row).to_string()),
                ));
            index.entries += 1;
        }
        Ok(index)
    }

    /// Catalog matches for a played song
    pub fn lookup(&self, title: &str, artist_name: &str) -> &[Match] {
        self.by_title
            .get(title)
            .and_then(|artists| artists.get(artist_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of indexed catalog rows
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Check if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// Build the songplays for one partition of prepared NextSong events
///
/// `partition` seeds the id allocator, so it must be distinct per call
/// within a run.
pub fn assemble_partition(
    batch: &RecordBatch,
    partition: usize,
    catalog: &CatalogIndex,
) -> Result<RecordBatch> {
    let schema = batch.schema();
    let songs = batch.column(schema.index_of("song")?).as_string::<i32>();
    let artists = batch.column(schema.index_of("artist")?).as_string::<i32>();

    let mut rows: Vec<u32> = Vec::with_capacity(batch.num_rows());
    let mut song_ids: Vec<Option<&str>> = Vec::with_capacity(batch.num_rows());
    let mut artist_ids: Vec<Option<&str>> = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let matches: &[Match] = match (songs.is_valid(row), artists.is_valid(row)) {
            (true, true) => catalog.lookup(songs.value(row), artists.value(row)),
            _ => &[],
        };
        if matches.is_empty() {
            rows.push(row as u32);
            song_ids.push(None);
            artist_ids.push(None);
        }
        for (song_id, artist_id) in matches {
            rows.push(row as u32);
            song_ids.push(song_id.as_deref());
            artist_ids.push(artist_id.as_deref());
        }
    }

    let carried = take_record_batch(&project(batch, &CARRIED)?, &UInt32Array::from(rows))?;

    let mut ids = IdAllocator::for_partition(partition);
    let songplay_ids = (0..carried.num_rows())
        .map(|_| ids.next_id())
        .collect::<Result<Vec<i64>>>()?;
    let songplay_ids = Int64Array::from(songplay_ids);
    let (years, months) = year_month(carried.column(0).as_string::<i32>());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(songplay_ids),
        carried.column(0).clone(),
        carried.column(1).clone(),
        carried.column(2).clone(),
        Arc::new(StringArray::from(song_ids)),
        Arc::new(StringArray::from(artist_ids)),
        carried.column(3).clone(),
        carried.column(4).clone(),
        carried.column(5).clone(),
        Arc::new(years),
        Arc::new(months),
    ];

    Ok(RecordBatch::try_new(SONGPLAY_SCHEMA.clone(), columns)?)
}

/// Build the Songplays fact table with one blocking task per log partition
///
/// Output partitions keep the input order, so partition `i` always carries
/// ids from allocator `i`.
pub async fn assemble_songplays(log: &Table, catalog: &Table) -> Result<Table> {
    let index = Arc::new(CatalogIndex::build(catalog)?);
    debug!("Catalog index holds {} songs", index.len());

    let tasks = log
        .partitions()
        .iter()
        .cloned()
        .enumerate()
        .map(|(partition, batch)| {
            let index = Arc::clone(&index);
            tokio::task::spawn_blocking(move || assemble_partition(&batch, partition, &index))
        });

    let partitions = try_join_all(tasks)
        .await?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::new(SONGPLAY_SCHEMA.clone(), partitions))
}

/// Songplays in a batch that found no catalog match
pub fn count_unmatched(batch: &RecordBatch) -> usize {
    batch.column_by_name("song_id").map_or(0, |c| c.null_count())
}
