//! CLI arguments

use crate::config::DEFAULT_CONFIG_PATH;
use crate::types::TimestampZone;
use clap::Parser;
use std::path::PathBuf;

/// Build the songplay star schema from raw song and event logs
#[derive(Parser, Debug)]
#[command(name = "songplay-lake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Input root, overriding `data.input_data` (local path or s3:// URL)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output root, overriding `data.output_data` (local path or s3:// URL)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Zone used to format start_time, overriding `data.timezone`
    #[arg(long, value_enum)]
    pub timezone: Option<TimestampZone>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
