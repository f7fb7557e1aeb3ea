//! Column renaming
//!
//! Raw sources use their own field names (`firstName`, `artist_name`, ...).
//! A `ColumnMapping` lists old→new pairs and `rename_columns` applies them
//! all at once, so application order never matters.

use crate::error::{Error, Result};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered old→new column name pairs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    /// Build a mapping from pairs
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a mapping from an untyped JSON value
    ///
    /// The value must be an object whose values are all strings.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::config(format!(
                "column mapping must be an object of old→new names, got {}",
                json_kind(value)
            )));
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (old, new) in map {
            let new = new.as_str().ok_or_else(|| {
                Error::invalid_value(old, format!("new column name must be a string, got {}", json_kind(new)))
            })?;
            pairs.push((old.clone(), new.to_string()));
        }
        Ok(Self { pairs })
    }

    /// Iterate over (old, new) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(o, n)| (o.as_str(), n.as_str()))
    }

    /// Number of renames
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if the mapping renames nothing
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// New name for `column`, if it is renamed
    pub fn target(&self, column: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(old, _)| old == column)
            .map(|(_, new)| new.as_str())
    }
}

impl TryFrom<&Value> for ColumnMapping {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Event log field names → fact/dimension column names
pub fn log_column_mapping() -> ColumnMapping {
    ColumnMapping::new([
        ("firstName", "first_name"),
        ("lastName", "last_name"),
        ("sessionId", "session_id"),
        ("userAgent", "user_agent"),
        ("userId", "user_id"),
    ])
}

/// Catalog artist field names → Artists column names
pub fn artist_column_mapping() -> ColumnMapping {
    ColumnMapping::new([
        ("artist_name", "name"),
        ("artist_location", "location"),
        ("artist_latitude", "latitude"),
        ("artist_longitude", "longitude"),
    ])
}

/// Rename columns of a batch; data is shared, not copied
///
/// Every old name must exist in the batch, and no two resulting columns may
/// share a name.
pub fn rename_columns(batch: &RecordBatch, mapping: &ColumnMapping) -> Result<RecordBatch> {
    let schema = batch.schema();

    for (old, _) in mapping.iter() {
        if schema.column_with_name(old).is_none() {
            return Err(Error::config(format!(
                "cannot rename '{old}': no such column"
            )));
        }
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| match mapping.target(field.name()) {
            Some(new) => field.as_ref().clone().with_name(new),
            None => field.as_ref().clone(),
        })
        .collect();

    let mut names = HashSet::with_capacity(fields.len());
    for field in &fields {
        if !names.insert(field.name().as_str()) {
            return Err(Error::config(format!(
                "rename produces duplicate column '{}'",
                field.name()
            )));
        }
    }

    let renamed = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    Ok(RecordBatch::try_new(renamed, batch.columns().to_vec())?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
