//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! With no arguments the binary loads `dl.yaml` from the working directory
//! and runs the whole pipeline. Flags override the config file's data paths.

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
