//! Source reader
//!
//! Lists the files under an input root that match a glob, decodes each one
//! and returns them as a `Table` with one partition per file.

use super::glob::GlobPattern;
use super::schema::{decode_records, records_to_batch, LOG_SCHEMA, SONG_SCHEMA};
use crate::error::{Error, Result, ResultExt};
use crate::storage::StorageLocation;
use crate::types::Table;
use arrow::datatypes::SchemaRef;
use tracing::debug;

/// Glob for song catalog files, relative to the input root
pub const SONG_DATA_GLOB: &str = "song_data/*/*/*/*.json";

/// Glob for event log files, relative to the input root
pub const LOG_DATA_GLOB: &str = "log_data/*.json";

/// Reads the raw record streams from an input root
#[derive(Debug, Clone)]
pub struct SourceReader {
    location: StorageLocation,
}

impl SourceReader {
    /// Create a reader over an input root
    pub fn new(location: StorageLocation) -> Self {
        Self { location }
    }

    /// The input root
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Read the song catalog
    pub async fn read_song_data(&self) -> Result<Table> {
        self.read_glob(SONG_DATA_GLOB, &SONG_SCHEMA).await
    }

    /// Read the event log
    pub async fn read_log_data(&self) -> Result<Table> {
        self.read_glob(LOG_DATA_GLOB, &LOG_SCHEMA).await
    }

    /// Relative keys matching `pattern`, sorted
    pub async fn matching_keys(&self, pattern: &GlobPattern) -> Result<Vec<String>> {
        let prefix = pattern.literal_prefix();
        let objects = self
            .location
            .list(&prefix)
            .await
            .source_context(self.location.display_key(&prefix))?;

        let mut keys: Vec<String> = objects
            .iter()
            .map(|meta| self.location.relative(&meta.location))
            .filter(|key| pattern.matches(key))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Read every file matching `glob` into a table conforming to `schema`
    pub async fn read_glob(&self, glob: &str, schema: &SchemaRef) -> Result<Table> {
        let pattern = GlobPattern::new(glob)?;
        let keys = self.matching_keys(&pattern).await?;
        if keys.is_empty() {
            return Err(Error::NoInputFiles {
                pattern: self.location.display_key(pattern.as_str()),
            });
        }

        let mut partitions = Vec::with_capacity(keys.len());
        for key in &keys {
            let shown = self.location.display_key(key);
            let body = self
                .location
                .get(key)
                .await
                .source_context(&shown)?;
            let records = decode_records(&shown, &body)?;
            debug!("Read {} records from {}", records.len(), shown);
            partitions.push(records_to_batch(&records, schema)?);
        }

        Ok(Table::new(schema.clone(), partitions))
    }
}
