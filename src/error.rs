//! Error types for songplay-lake
//!
//! Every public operation returns `Result<T, Error>`. The variants follow the
//! three fatal failure classes of a run: configuration, source reads and
//! table writes. Data-quality problems (bad timestamps, unmatched joins,
//! duplicate keys) are never errors; they surface as nulls or extra rows.

use std::fmt;
use thiserror::Error;

/// The main error type for songplay-lake
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("No input files match '{pattern}'")]
    NoInputFiles { pattern: String },

    #[error("Failed to read source '{path}': {message}")]
    SourceRead { path: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Write Errors
    // ============================================================================
    #[error("Failed to write table '{table}': {message}")]
    Write { table: String, message: String },

    // ============================================================================
    // Arrow/Parquet/Storage Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a source read error
    pub fn source_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Configuration problems are detected before any input is touched
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingConfigField { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
        )
    }

    /// Check if this error came from reading input
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            Error::NoInputFiles { .. } | Error::SourceRead { .. } | Error::JsonParse(_)
        )
    }

    /// Check if this error came from persisting a table
    pub fn is_write(&self) -> bool {
        matches!(self, Error::Write { .. })
    }
}

/// Result type alias for songplay-lake
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for attaching run context to foreign errors
///
/// Each method keeps the failure class, so `is_config`, `is_source` and
/// `is_write` still hold after the context is added.
pub trait ResultExt<T> {
    /// Report the error as a config problem, prefixed with `message`
    fn config_context(self, message: impl Into<String>) -> Result<T>;

    /// Report the error as a failed read of `path`
    fn source_context(self, path: impl Into<String>) -> Result<T>;

    /// Report the error as a failed write of `table`
    fn write_context(self, table: impl Into<String>) -> Result<T>;
}

impl<T, E: fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn config_context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::config(format!("{}: {e}", message.into())))
    }

    fn source_context(self, path: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::source_read(path, e.to_string()))
    }

    fn write_context(self, table: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::write(table, e.to_string()))
    }
}
