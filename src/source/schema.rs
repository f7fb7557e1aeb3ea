//! Fixed Arrow schemas for the two raw record streams and JSON decoding
//! against them.
//!
//! Input files are untyped JSON, so every value is coerced to its column's
//! type. A value that cannot be coerced becomes null rather than failing the
//! read.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Schema of one song catalog record
pub static SONG_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("duration", DataType::Float64, true),
        Field::new("num_songs", DataType::Int64, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("year", DataType::Int64, true),
    ]))
});

/// Schema of one event log record
pub static LOG_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("artist", DataType::Utf8, true),
        Field::new("auth", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("itemInSession", DataType::Int64, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("length", DataType::Float64, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("method", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, true),
        Field::new("registration", DataType::Float64, true),
        Field::new("sessionId", DataType::Int64, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("status", DataType::Int64, true),
        Field::new("ts", DataType::Int64, true),
        Field::new("userAgent", DataType::Utf8, true),
        Field::new("userId", DataType::Utf8, true),
    ]))
});

/// Decode the JSON objects in one file body
///
/// A file may hold a single object or many newline-delimited ones.
pub fn decode_records(path: &str, body: &[u8]) -> Result<Vec<JsonValue>> {
    let mut records = Vec::new();
    for (idx, item) in serde_json::Deserializer::from_slice(body)
        .into_iter::<JsonValue>()
        .enumerate()
    {
        let value = item.map_err(|e| Error::source_read(path, format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(Error::source_read(
                path,
                format!("record {idx} is not a JSON object"),
            ));
        }
        records.push(value);
    }
    Ok(records)
}

/// Convert JSON records to a RecordBatch with the given schema
///
/// Keys absent from the schema are ignored; schema columns absent from a
/// record are null.
pub fn records_to_batch(records: &[JsonValue], schema: &SchemaRef) -> Result<RecordBatch> {
    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema.clone()));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let values: Vec<Option<&JsonValue>> = records
            .iter()
            .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
            .collect();

        columns.push(build_array(&values, field.data_type())?);
    }

    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Build an Arrow array from JSON values, coercing to `data_type`
fn build_array(values: &[Option<&JsonValue>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(coerce_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values.iter().map(|v| v.and_then(coerce_f64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        other => Err(Error::Other(format!(
            "Unsupported source column type: {other:?}"
        ))),
    }
}

fn coerce_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e18)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
