//! Users dimension: each user's latest known state
//!
//! Only NextSong events are considered, so a user's level is whatever their
//! most recent song play carried. "Most recent" is the maximum `start_time`
//! string, compared lexicographically; see `transform::time` for why that
//! equals chronological order.
//!
//! The winning rows are found by matching (user_id, start_time) back onto
//! the events. When a user has several events at their maximum `start_time`
//! all of them are emitted, so the table can hold more than one row per
//! user id. No tie-break is applied.

use crate::error::Result;
use crate::transform::dedup::project;
use crate::transform::time::START_TIME;
use crate::types::Table;
use arrow::array::{AsArray, UInt32Array};
use arrow::compute::take_record_batch;
use std::collections::HashMap;
use tracing::warn;

/// Columns of the Users dimension, in output order
pub const USER_COLUMNS: [&str; 5] = ["user_id", "first_name", "last_name", "gender", "level"];

/// Build the Users dimension from prepared NextSong events
pub fn resolve_users(log: &Table) -> Result<Table> {
    let merged = log.concat()?;
    let schema = merged.schema();
    let user_ids = merged.column(schema.index_of("user_id")?).as_string::<i32>();
    let start_times = merged.column(schema.index_of(START_TIME)?).as_string::<i32>();

    // Groups in first-seen order; the null user id is a group of its own.
    let mut order: Vec<Option<&str>> = Vec::new();
    let mut latest: HashMap<Option<&str>, Option<&str>> = HashMap::new();
    for (user, start) in user_ids.iter().zip(start_times.iter()) {
        let slot = latest.entry(user).or_insert_with(|| {
            order.push(user);
            None
        });
        if let Some(start) = start {
            if slot.map_or(true, |current| start > current) {
                *slot = Some(start);
            }
        }
    }

    // Rows sitting at their user's maximum. Null ids never match, as in an
    // equi-join.
    let mut winners: HashMap<&str, Vec<u32>> = HashMap::new();
    for (row, (user, start)) in user_ids.iter().zip(start_times.iter()).enumerate() {
        if let (Some(user), Some(start)) = (user, start) {
            if latest.get(&Some(user)).copied().flatten() == Some(start) {
                winners.entry(user).or_default().push(row as u32);
            }
        }
    }

    let mut indices: Vec<Option<u32>> = Vec::with_capacity(order.len());
    let mut tied = 0usize;
    for user in order {
        if latest.get(&user).copied().flatten().is_none() {
            continue;
        }
        match user.and_then(|u| winners.get(u)) {
            Some(rows) => {
                if rows.len() > 1 {
                    tied += 1;
                }
                indices.extend(rows.iter().copied().map(Some));
            }
            // Unmatched group: the join leaves every projected column null.
            None => indices.push(None),
        }
    }

    if tied > 0 {
        warn!(
            "{} users have several events at their latest start_time; all are kept",
            tied
        );
    }

    let projected = project(&merged, &USER_COLUMNS)?;
    let users = take_record_batch(&projected, &UInt32Array::from(indices))?;
    Ok(Table::from_batch(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::StringArray;
    use arrow::record_batch::RecordBatch;
    use arrow::datatypes::{DataType, Field, Schema};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    type Event<'a> = (Option<&'a str>, Option<&'a str>, &'a str);

    fn ev<'a>(user: Option<&'a str>, start: Option<&'a str>, level: &'a str) -> Event<'a> {
        (user, start, level)
    }

    fn log(events: &[Event<'_>]) -> Table {
        let schema = Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Utf8, true),
            Field::new("first_name", DataType::Utf8, true),
            Field::new("last_name", DataType::Utf8, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
            Field::new(START_TIME, DataType::Utf8, true),
        ]));
        let n = events.len();
        let users: StringArray = events.iter().map(|e| e.0).collect();
        let levels: StringArray = events.iter().map(|e| Some(e.2)).collect();
        let starts: StringArray = events.iter().map(|e| e.1).collect();
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(users),
                Arc::new(StringArray::from(vec!["Ann"; n])),
                Arc::new(StringArray::from(vec!["Lee"; n])),
                Arc::new(StringArray::from(vec!["F"; n])),
                Arc::new(levels),
                Arc::new(starts),
            ],
        )
        .unwrap();
        Table::from_batch(batch)
    }

    fn levels(table: &Table) -> Vec<(Option<String>, Option<String>)> {
        let batch = table.concat().unwrap();
        let ids = batch.column(0).as_string::<i32>();
        let levels = batch.column(4).as_string::<i32>();
        ids.iter()
            .zip(levels.iter())
            .map(|(i, l)| (i.map(String::from), l.map(String::from)))
            .collect()
    }

    #[test]
    fn test_latest_level_wins() {
        let table = log(&[
            ev(Some("U1"), Some("2024-01-01 10:00:00"), "free"),
            ev(Some("U1"), Some("2024-01-01 11:00:00"), "paid"),
        ]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(
            levels(&users),
            vec![(Some("U1".to_string()), Some("paid".to_string()))]
        );
    }

    #[test]
    fn test_one_row_per_user_without_ties() {
        let table = log(&[
            ev(Some("U2"), Some("2024-01-02 09:00:00"), "paid"),
            ev(Some("U1"), Some("2024-01-01 10:00:00"), "free"),
            ev(Some("U2"), Some("2024-01-01 09:00:00"), "free"),
        ]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(
            levels(&users),
            vec![
                (Some("U2".to_string()), Some("paid".to_string())),
                (Some("U1".to_string()), Some("free".to_string())),
            ]
        );
    }

    // Ties at the latest start_time fan out instead of picking a winner.
    #[test]
    fn test_tied_latest_rows_fan_out() {
        let table = log(&[
            ev(Some("U1"), Some("2024-01-01 11:00:00"), "free"),
            ev(Some("U1"), Some("2024-01-01 11:00:00"), "paid"),
            ev(Some("U1"), Some("2024-01-01 08:00:00"), "free"),
        ]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(users.num_rows(), 2);
        assert_eq!(
            levels(&users),
            vec![
                (Some("U1".to_string()), Some("free".to_string())),
                (Some("U1".to_string()), Some("paid".to_string())),
            ]
        );
    }

    #[test]
    fn test_user_without_start_time_dropped() {
        let table = log(&[
            ev(Some("U1"), None, "free"),
            ev(Some("U2"), Some("2024-01-01 10:00:00"), "paid"),
        ]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(
            levels(&users),
            vec![(Some("U2".to_string()), Some("paid".to_string()))]
        );
    }

    #[test]
    fn test_null_start_time_ignored_for_max() {
        let table = log(&[
            ev(Some("U1"), Some("2024-01-01 10:00:00"), "free"),
            ev(Some("U1"), None, "paid"),
        ]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(
            levels(&users),
            vec![(Some("U1".to_string()), Some("free".to_string()))]
        );
    }

    #[test]
    fn test_null_user_group_projects_nulls() {
        let table = log(&[ev(None, Some("2024-01-01 10:00:00"), "free")]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(levels(&users), vec![(None, None)]);
    }

    #[test]
    fn test_lexicographic_order_matches_chronology() {
        let table = log(&[
            ev(Some("U1"), Some("2024-01-09 23:59:59"), "free"),
            ev(Some("U1"), Some("2024-01-10 00:00:00"), "paid"),
        ]);
        let users = resolve_users(&table).unwrap();
        assert_eq!(
            levels(&users),
            vec![(Some("U1".to_string()), Some("paid".to_string()))]
        );
    }

    #[test]
    fn test_empty_log() {
        let table = log(&[]);
        let users = resolve_users(&table).unwrap();
        assert!(users.is_empty());
        assert_eq!(users.schema().fields().len(), USER_COLUMNS.len());
    }
}
