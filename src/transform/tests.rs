//! Tests for transform stages working together

use super::*;
use crate::source::{records_to_batch, LOG_SCHEMA, SONG_SCHEMA};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{Int32Type, Int64Type};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashSet;

fn catalog(records: &[Value]) -> Table {
    Table::from_batch(records_to_batch(records, &SONG_SCHEMA).unwrap())
}

fn log(partitions: &[&[Value]]) -> Table {
    let batches = partitions
        .iter()
        .map(|records| records_to_batch(records, &LOG_SCHEMA).unwrap())
        .collect();
    Table::new(LOG_SCHEMA.clone(), batches)
}

fn event(user: &str, ts: i64, page: &str, song: &str, artist: &str, level: &str) -> Value {
    json!({
        "artist": artist, "auth": "Logged In", "firstName": "Ann", "gender": "F",
        "itemInSession": 0, "lastName": "Lee", "length": 200.0, "level": level,
        "location": "Oslo", "method": "PUT", "page": page, "registration": 1.5e12,
        "sessionId": 42, "song": song, "status": 200, "ts": ts,
        "userAgent": "Mozilla/5.0", "userId": user
    })
}

fn catalog_song(song_id: &str, title: &str, artist_id: &str, artist_name: &str) -> Value {
    json!({
        "song_id": song_id, "title": title, "artist_id": artist_id,
        "artist_name": artist_name, "year": 2000, "duration": 180.0, "num_songs": 1
    })
}

fn strings(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    batch
        .column_by_name(column)
        .unwrap()
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(String::from))
        .collect()
}

// ============================================================================
// Log Preparation
// ============================================================================

#[test]
fn test_filter_next_song_drops_other_pages_and_nulls() {
    let mut no_page = event("U1", 1_000, "NextSong", "X", "Band", "free");
    no_page["page"] = Value::Null;
    let batch = records_to_batch(
        &[
            event("U1", 1_000, "NextSong", "X", "Band", "free"),
            event("U1", 2_000, "Home", "", "", "free"),
            event("U1", 3_000, "nextsong", "X", "Band", "free"),
            no_page,
        ],
        &LOG_SCHEMA,
    )
    .unwrap();

    let plays = filter_next_song(&batch).unwrap();
    assert_eq!(plays.num_rows(), 1);
}

#[test]
fn test_prepare_log_renames_and_adds_start_time() {
    let table = log(&[&[event("26", 1_700_000_000_000, "NextSong", "X", "Band", "free")]]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();
    let schema = prepared.schema();

    for column in ["first_name", "last_name", "session_id", "user_agent", "user_id", START_TIME] {
        assert!(schema.column_with_name(column).is_some(), "missing {column}");
    }
    assert!(schema.column_with_name("userId").is_none());

    let batch = prepared.concat().unwrap();
    assert_eq!(strings(&batch, START_TIME), vec![Some("2023-11-14 22:13:20".to_string())]);
}

#[test]
fn test_prepare_log_keeps_partitioning() {
    let table = log(&[
        &[event("1", 1_000, "NextSong", "X", "Band", "free")],
        &[event("2", 2_000, "Logout", "X", "Band", "free")],
    ]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();
    assert_eq!(prepared.num_partitions(), 2);
    assert_eq!(prepared.partitions()[0].num_rows(), 1);
    assert_eq!(prepared.partitions()[1].num_rows(), 0);
}

#[test]
fn test_prepare_log_without_partitions() {
    let table = Table::empty(LOG_SCHEMA.clone());
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();
    assert!(prepared.schema().column_with_name(START_TIME).is_some());
    assert!(resolve_users(&prepared).unwrap().is_empty());
}

// ============================================================================
// Songplays
// ============================================================================

#[tokio::test]
async fn test_songplay_matches_catalog() {
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let table = log(&[&[
        event("U1", 1_700_000_000_000, "NextSong", "X", "Band", "free"),
        event("U1", 1_700_000_100_000, "NextSong", "Y", "Band", "free"),
    ]]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();

    let songplays = assemble_songplays(&prepared, &catalog).await.unwrap();
    assert_eq!(songplays.num_rows(), 2);

    let batch = songplays.concat().unwrap();
    assert_eq!(strings(&batch, "song_id"), vec![Some("S1".to_string()), None]);
    assert_eq!(strings(&batch, "artist_id"), vec![Some("A1".to_string()), None]);
    assert_eq!(songplays::count_unmatched(&batch), 1);
}

#[tokio::test]
async fn test_songplay_join_is_case_sensitive() {
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let table = log(&[&[event("U1", 1_000, "NextSong", "x", "band", "free")]]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();

    let batch = assemble_songplays(&prepared, &catalog).await.unwrap().concat().unwrap();
    assert_eq!(strings(&batch, "song_id"), vec![None]);
}

#[tokio::test]
async fn test_songplay_fans_out_on_ambiguous_title() {
    let catalog = catalog(&[
        catalog_song("S1", "X", "A1", "Band"),
        catalog_song("S2", "X", "A9", "Band"),
        catalog_song("S1", "X", "A1", "Band"),
    ]);
    let table = log(&[&[event("U1", 1_000, "NextSong", "X", "Band", "free")]]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();

    let batch = assemble_songplays(&prepared, &catalog).await.unwrap().concat().unwrap();
    assert_eq!(
        strings(&batch, "song_id"),
        vec![Some("S1".to_string()), Some("S2".to_string())]
    );
}

#[tokio::test]
async fn test_songplay_columns_and_partition_keys() {
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let table = log(&[&[event("U7", 1_541_903_636_796, "NextSong", "X", "Band", "paid")]]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();

    let batch = assemble_songplays(&prepared, &catalog).await.unwrap().concat().unwrap();
    let names: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "songplay_id", "start_time", "user_id", "level", "song_id", "artist_id",
            "session_id", "location", "user_agent", "year", "month"
        ]
    );

    assert_eq!(strings(&batch, START_TIME), vec![Some("2018-11-11 02:33:56".to_string())]);
    let year = batch.column_by_name("year").unwrap().as_primitive::<Int32Type>();
    let month = batch.column_by_name("month").unwrap().as_primitive::<Int32Type>();
    assert_eq!((year.value(0), month.value(0)), (2018, 11));
    let session = batch.column_by_name("session_id").unwrap().as_primitive::<Int64Type>();
    assert_eq!(session.value(0), 42);
}

#[tokio::test]
async fn test_songplay_ids_unique_across_partitions() {
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let table = log(&[
        &[
            event("U1", 1_000, "NextSong", "X", "Band", "free"),
            event("U1", 2_000, "NextSong", "X", "Band", "free"),
        ],
        &[event("U2", 3_000, "NextSong", "X", "Band", "free")],
    ]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();
    let songplays = assemble_songplays(&prepared, &catalog).await.unwrap();

    let mut seen = HashSet::new();
    for batch in songplays.partitions() {
        let col = batch.column(0).as_primitive::<Int64Type>();
        assert_eq!(col.null_count(), 0);
        seen.extend(col.values().iter().copied());
    }
    assert_eq!(seen.len(), 3);
    assert!(seen.contains(&0));
    assert!(seen.contains(&1));
    assert!(seen.contains(&(1_i64 << ids::PARTITION_SHIFT)));
}

#[tokio::test]
async fn test_songplay_partitions_keep_input_order() {
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let table = log(&[
        &[event("U1", 1_000, "NextSong", "X", "Band", "free")],
        &[event("U2", 2_000, "NextSong", "Y", "Band", "free")],
        &[event("U3", 3_000, "NextSong", "X", "Band", "free")],
    ]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();

    let songplays = assemble_songplays(&prepared, &catalog).await.unwrap();
    assert_eq!(songplays.num_partitions(), 3);
    for (i, batch) in songplays.partitions().iter().enumerate() {
        let first = batch.column(0).as_primitive::<Int64Type>().value(0);
        assert_eq!(first, (i as i64) << ids::PARTITION_SHIFT);
    }
    assert_eq!(
        strings(&songplays.partitions()[1], "user_id"),
        vec![Some("U2".to_string())]
    );
}

#[tokio::test]
async fn test_songplay_null_timestamp_still_present() {
    let mut no_ts = event("U1", 0, "NextSong", "X", "Band", "free");
    no_ts["ts"] = Value::Null;
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let prepared = prepare_log(&log(&[&[no_ts]]), TimestampZone::Utc).unwrap();

    let batch = assemble_songplays(&prepared, &catalog).await.unwrap().concat().unwrap();
    assert_eq!(batch.num_rows(), 1);
    assert!(batch.column_by_name("year").unwrap().is_null(0));
    assert_eq!(strings(&batch, "song_id"), vec![Some("S1".to_string())]);
}

#[test]
fn test_catalog_index_skips_null_keys() {
    let mut nameless = catalog_song("S2", "Y", "A2", "");
    nameless["artist_name"] = Value::Null;
    let index = CatalogIndex::build(&catalog(&[catalog_song("S1", "X", "A1", "Band"), nameless]))
        .unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.lookup("X", "Band").len(), 1);
    assert!(index.lookup("Y", "").is_empty());
}

// ============================================================================
// Cardinality Properties
// ============================================================================

#[tokio::test]
async fn test_table_cardinalities() {
    let catalog = catalog(&[catalog_song("S1", "X", "A1", "Band")]);
    let table = log(&[
        &[
            event("U1", 1_700_000_000_000, "NextSong", "X", "Band", "free"),
            event("U1", 1_700_000_000_000, "NextSong", "Z", "Band", "free"),
            event("U2", 1_700_000_060_000, "NextSong", "X", "Band", "paid"),
            event("U3", 1_700_000_120_000, "Home", "", "", "free"),
        ],
        &[event("U1", 1_700_003_600_000, "NextSong", "X", "Band", "paid")],
    ]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();

    // NextSong events: 4, distinct start_times: 3, distinct users: 2
    assert_eq!(assemble_songplays(&prepared, &catalog).await.unwrap().num_rows(), 4);
    assert_eq!(extract_time(&prepared).unwrap().num_rows(), 3);

    let users = resolve_users(&prepared).unwrap().concat().unwrap();
    assert_eq!(
        strings(&users, "user_id"),
        vec![Some("U1".to_string()), Some("U2".to_string())]
    );
    assert_eq!(
        strings(&users, "level"),
        vec![Some("paid".to_string()), Some("paid".to_string())]
    );
}

#[test]
fn test_time_row_matches_epoch_date() {
    let table = log(&[&[event("U1", 1_700_000_000_000, "NextSong", "X", "Band", "free")]]);
    let prepared = prepare_log(&table, TimestampZone::Utc).unwrap();
    let time = extract_time(&prepared).unwrap().concat().unwrap();

    assert_eq!(time.num_rows(), 1);
    let get = |name: &str| {
        time.column_by_name(name)
            .unwrap()
            .as_primitive::<Int32Type>()
            .value(0)
    };
    assert_eq!((get("year"), get("month"), get("day")), (2023, 11, 14));
}
