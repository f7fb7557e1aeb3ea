//! Event timestamps and the Time dimension
//!
//! Events carry `ts` as epoch milliseconds. It is truncated to whole seconds
//! and rendered as `YYYY-MM-DD HH:MM:SS` in the configured zone. That string
//! is what every downstream table keys on.
//!
//! The format is fixed-width and zero-padded, so comparing two `start_time`
//! strings lexicographically gives the same answer as comparing the instants.
//! The Users dimension relies on that when it picks each user's latest event.
//! Changing the format breaks that resolution.

use crate::error::Result;
use crate::transform::dedup::{distinct_rows, project};
use crate::types::{Table, TimestampZone};
use arrow::array::{Array, ArrayRef, AsArray, Int32Array, StringArray};
use arrow::compute::{filter_record_batch, is_not_null};
use arrow::datatypes::{DataType, Field, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Format of `start_time` strings
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the derived timestamp column
pub const START_TIME: &str = "start_time";

/// Schema of the Time dimension
pub static TIME_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(START_TIME, DataType::Utf8, true),
        Field::new("hour", DataType::Int32, true),
        Field::new("day", DataType::Int32, true),
        Field::new("week_of_year", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
        Field::new("year", DataType::Int32, true),
        Field::new("weekday", DataType::Int32, true),
    ]))
});

/// Render epoch milliseconds as a `start_time` string
///
/// Milliseconds are truncated toward zero. Returns `None` when the instant is
/// outside the representable range.
pub fn format_start_time(ts_millis: i64, zone: TimestampZone) -> Option<String> {
    let utc = DateTime::from_timestamp(ts_millis / 1000, 0)?;
    let rendered = match zone {
        TimestampZone::Utc => utc.format(START_TIME_FORMAT).to_string(),
        TimestampZone::Local => utc.with_timezone(&Local).format(START_TIME_FORMAT).to_string(),
    };
    Some(rendered)
}

/// Parse a `start_time` string back into a calendar timestamp
pub fn parse_start_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, START_TIME_FORMAT).ok()
}

/// Calendar attributes of one `start_time`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub hour: i32,
    pub day: i32,
    pub week_of_year: i32,
    pub month: i32,
    pub year: i32,
    /// 1 = Sunday ... 7 = Saturday
    pub weekday: i32,
}

impl TimeParts {
    /// Decompose a `start_time` string; `None` if it does not parse
    pub fn from_start_time(value: &str) -> Option<Self> {
        let ts = parse_start_time(value)?;
        Some(Self {
            hour: ts.hour() as i32,
            day: ts.day() as i32,
            week_of_year: ts.iso_week().week() as i32,
            month: ts.month() as i32,
            year: ts.year(),
            weekday: ts.weekday().number_from_sunday() as i32,
        })
    }
}

/// Append a `start_time` column derived from `ts`
///
/// Null `ts` gives a null `start_time`.
pub fn with_start_time(batch: &RecordBatch, zone: TimestampZone) -> Result<RecordBatch> {
    let schema = batch.schema();
    let ts = batch.column(schema.index_of("ts")?).as_primitive::<Int64Type>();

    let start_times: StringArray = ts
        .iter()
        .map(|v| v.and_then(|millis| format_start_time(millis, zone)))
        .collect();

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(START_TIME, DataType::Utf8, true));

    let mut columns = batch.columns().to_vec();
    columns.push(Arc::new(start_times));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Build the Time dimension from prepared NextSong events
///
/// One row per distinct non-null `start_time`.
pub fn extract_time(log: &Table) -> Result<Table> {
    let merged = log.concat()?;
    let start_times = distinct_rows(&project(&merged, &[START_TIME])?)?;
    let present = is_not_null(start_times.column(0))?;
    let start_times = filter_record_batch(&start_times, &present)?;

    let batch = decompose(start_times.column(0).as_string::<i32>())?;
    Ok(Table::from_batch(distinct_rows(&batch)?))
}

fn decompose(start_times: &StringArray) -> Result<RecordBatch> {
    let parts: Vec<Option<TimeParts>> = start_times
        .iter()
        .map(|v| v.and_then(TimeParts::from_start_time))
        .collect();

    let column = |f: fn(&TimeParts) -> i32| -> ArrayRef {
        Arc::new(parts.iter().map(|p| p.as_ref().map(f)).collect::<Int32Array>())
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(start_times.clone()),
        column(|p| p.hour),
        column(|p| p.day),
        column(|p| p.week_of_year),
        column(|p| p.month),
        column(|p| p.year),
        column(|p| p.weekday),
    ];

    Ok(RecordBatch::try_new(TIME_SCHEMA.clone(), columns)?)
}

/// Year and month columns for a `start_time` column
pub fn year_month(start_times: &StringArray) -> (Int32Array, Int32Array) {
    let parts: Vec<Option<TimeParts>> = start_times
        .iter()
        .map(|v| v.and_then(TimeParts::from_start_time))
        .collect();
    let years = parts.iter().map(|p| p.map(|p| p.year)).collect();
    let months = parts.iter().map(|p| p.map(|p| p.month)).collect();
    (years, months)
}

/// Number of non-null `start_time` values in a batch
pub fn count_start_times(batch: &RecordBatch) -> usize {
    batch
        .column_by_name(START_TIME)
        .map_or(0, |c| c.len() - c.null_count())
}
