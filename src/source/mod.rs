//! Source module
//!
//! Turns the raw JSON inputs into Arrow tables.
//!
//! # Layout
//!
//! - Song catalog: `<input>/song_data/*/*/*/*.json`, one object per file
//! - Event log: `<input>/log_data/*.json`, newline-delimited objects
//!
//! Each matched file becomes one partition of the resulting `Table`. A glob
//! that matches nothing, or a file that is not JSON objects, fails the read.

mod glob;
mod reader;
mod schema;

pub use glob::GlobPattern;
pub use reader::{SourceReader, LOG_DATA_GLOB, SONG_DATA_GLOB};
pub use schema::{decode_records, records_to_batch, LOG_SCHEMA, SONG_SCHEMA};
