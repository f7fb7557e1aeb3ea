//! CLI runner - loads config and executes the pipeline

use crate::cli::commands::Cli;
use crate::config::{load_config, EtlConfig};
use crate::error::Result;
use crate::pipeline::{Pipeline, RunSummary};
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the pipeline and print the per-table summary
    pub async fn run(&self) -> Result<()> {
        let summary = self.execute().await?;
        println!("{summary}");
        Ok(())
    }

    /// Run the pipeline, returning the summary instead of printing it
    pub async fn execute(&self) -> Result<RunSummary> {
        let config = self.load_config()?;
        debug!("Loaded config: {config:?}");
        Pipeline::from_config(&config)?.run().await
    }

    /// Load the config file and apply command-line overrides
    fn load_config(&self) -> Result<EtlConfig> {
        let mut config = load_config(&self.cli.config)?;
        if let Some(input) = &self.cli.input {
            config = config.with_input(input);
        }
        if let Some(output) = &self.cli.output {
            config = config.with_output(output);
        }
        if let Some(zone) = self.cli.timezone {
            config = config.with_timezone(zone);
        }
        Ok(config)
    }
}
