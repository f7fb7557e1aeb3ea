//! Run configuration
//!
//! A run is configured by a small YAML file with two required sections:
//! `aws` holds the storage credentials and `data` holds the input and output
//! roots. An optional `output` section tunes the Parquet files.
//!
//! ```yaml
//! aws:
//!   access_key_id: AKIA...
//!   secret_access_key: ...
//! data:
//!   input_data: s3://udacity-dend/
//!   output_data: s3://my-lake/
//! output:
//!   compression: zstd
//!   row_group_size: 65536
//! ```
//!
//! Everything is validated up front so that a bad file fails the run before
//! any input is listed.

use crate::error::{Error, Result, ResultExt};
use crate::types::TimestampZone;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "dl.yaml";

/// Default AWS region for S3 locations
pub const DEFAULT_REGION: &str = "us-west-2";

/// Default rows per Parquet row group
pub const DEFAULT_ROW_GROUP_SIZE: usize = 1024 * 1024;

// ============================================================================
// Raw file shape
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    aws: Option<RawAws>,
    #[serde(default)]
    data: Option<RawData>,
    #[serde(default)]
    output: Option<RawOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAws {
    #[serde(default)]
    access_key_id: Option<String>,
    #[serde(default)]
    secret_access_key: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    #[serde(default)]
    input_data: Option<String>,
    #[serde(default)]
    output_data: Option<String>,
    #[serde(default)]
    timezone: Option<TimestampZone>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(default)]
    compression: Option<ParquetCompression>,
    #[serde(default)]
    row_group_size: Option<usize>,
}

// ============================================================================
// Validated config
// ============================================================================

/// Storage credentials, passed explicitly to every store that needs them
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region for S3 locations
    pub region: String,
    /// Optional S3-compatible endpoint
    pub endpoint: Option<String>,
}

impl Credentials {
    /// Create credentials for the default region
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
        }
    }

    /// Set region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set a custom endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Input and output roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root holding `song_data/` and `log_data/`
    pub input_data: String,
    /// Root receiving the five table directories
    pub output_data: String,
    /// Zone used to format `start_time`
    pub timezone: TimestampZone,
}

/// Codec applied to every written Parquet file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParquetCompression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    #[serde(alias = "none")]
    Uncompressed,
}

/// Parquet file layout for the written tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub compression: ParquetCompression,
    /// Maximum rows per row group
    pub row_group_size: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::default(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

/// Complete, validated run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlConfig {
    /// Storage credentials
    pub credentials: Credentials,
    /// Data locations
    pub data: DataPaths,
    /// Parquet settings, defaulted when the section is absent
    pub output: OutputSettings,
}

impl EtlConfig {
    /// Replace the input root
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.data.input_data = input.into();
        self
    }

    /// Replace the output root
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.data.output_data = output.into();
        self
    }

    /// Replace the timestamp zone
    #[must_use]
    pub fn with_timezone(mut self, zone: TimestampZone) -> Self {
        self.data.timezone = zone;
        self
    }
}

/// Load and validate a config file
pub fn load_config(path: impl AsRef<Path>) -> Result<EtlConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .config_context(format!("Failed to read config file '{}'", path.display()))?;
    load_config_from_str(&content)
}

/// Parse and validate config from a YAML string
pub fn load_config_from_str(content: &str) -> Result<EtlConfig> {
    let raw: RawConfig = serde_yaml::from_str(content)?;

    let aws = raw.aws.ok_or_else(|| Error::missing_field("aws"))?;
    let data = raw.data.ok_or_else(|| Error::missing_field("data"))?;

    let mut credentials = Credentials::new(
        required(aws.access_key_id, "aws.access_key_id")?,
        required(aws.secret_access_key, "aws.secret_access_key")?,
    );
    if let Some(region) = aws.region.filter(|r| !r.trim().is_empty()) {
        credentials = credentials.with_region(region);
    }
    if let Some(endpoint) = aws.endpoint.filter(|e| !e.trim().is_empty()) {
        credentials = credentials.with_endpoint(endpoint);
    }

    Ok(EtlConfig {
        credentials,
        data: DataPaths {
            input_data: required(data.input_data, "data.input_data")?,
            output_data: required(data.output_data, "data.output_data")?,
            timezone: data.timezone.unwrap_or_default(),
        },
        output: output_settings(raw.output.unwrap_or_default())?,
    })
}

fn output_settings(raw: RawOutput) -> Result<OutputSettings> {
    let row_group_size = match raw.row_group_size {
        Some(0) => {
            return Err(Error::invalid_value(
                "output.row_group_size",
                "must be at least 1",
            ))
        }
        Some(size) => size,
        None => DEFAULT_ROW_GROUP_SIZE,
    };
    Ok(OutputSettings {
        compression: raw.compression.unwrap_or_default(),
        row_group_size,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::missing_field(field)),
    }
}
