//! Run orchestration
//!
//! A run reads the song catalog and writes Songs and Artists, then reads the
//! event log and writes Users, Time and Songplays. Each table is written as
//! soon as its own inputs are computed; any error aborts the remaining work.

use crate::config::EtlConfig;
use crate::error::Result;
use crate::output::{ObjectStoreSink, TableSink, WriteSpec, WriteSummary};
use crate::source::SourceReader;
use crate::storage::StorageLocation;
use crate::transform::{
    assemble_songplays, extract_artists, extract_songs, extract_time, prepare_log,
    resolve_users, songplays::count_unmatched, time::count_start_times,
};
use crate::types::{Table, TableName, TimestampZone};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// Run Summary
// ============================================================================

/// Tables written by one run, in write order
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// One entry per table written
    pub tables: Vec<WriteSummary>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Rows written for `table`, if it was written
    pub fn rows(&self, table: TableName) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            writeln!(
                f,
                "{:<10} {:>9} rows  {:>5} partitions",
                table.table.as_str(),
                table.rows,
                table.partitions
            )?;
        }
        write!(f, "Completed in {:.2}s", self.elapsed.as_secs_f64())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Reads the raw inputs, derives the five tables and hands them to a sink
pub struct Pipeline {
    reader: SourceReader,
    sink: Arc<dyn TableSink>,
    zone: TimestampZone,
}

impl Pipeline {
    /// Create a pipeline formatting `start_time` in the local zone
    pub fn new(reader: SourceReader, sink: Arc<dyn TableSink>) -> Self {
        Self {
            reader,
            sink,
            zone: TimestampZone::default(),
        }
    }

    /// Build a pipeline over the configured input and output roots
    pub fn from_config(config: &EtlConfig) -> Result<Self> {
        let input = StorageLocation::open(&config.data.input_data, &config.credentials)?;
        let output = StorageLocation::create(&config.data.output_data, &config.credentials)?;
        info!(
            "Input {} ({}), output {} ({})",
            config.data.input_data,
            input.scheme(),
            config.data.output_data,
            output.scheme()
        );
        let sink = ObjectStoreSink::new(output).with_settings(config.output);
        Ok(Self::new(SourceReader::new(input), Arc::new(sink)).with_timezone(config.data.timezone))
    }

    /// Set the zone used to format `start_time`
    #[must_use]
    pub fn with_timezone(mut self, zone: TimestampZone) -> Self {
        self.zone = zone;
        self
    }

    /// Run catalog extraction, then log extraction
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut tables = self.process_song_data().await?;
        tables.extend(self.process_log_data().await?);

        let summary = RunSummary {
            tables,
            elapsed: started.elapsed(),
        };
        info!("Run finished in {:.2}s", summary.elapsed.as_secs_f64());
        Ok(summary)
    }

    /// Songs and Artists from the song catalog
    pub async fn process_song_data(&self) -> Result<Vec<WriteSummary>> {
        let catalog = self.reader.read_song_data().await?;
        info!(
            "Read {} catalog records from {} files",
            catalog.num_rows(),
            catalog.num_partitions()
        );

        let songs = extract_songs(&catalog)?;
        let songs = self.write(TableName::Songs, &songs).await?;

        let artists = extract_artists(&catalog)?;
        let artists = self.write(TableName::Artists, &artists).await?;

        Ok(vec![songs, artists])
    }

    /// Users, Time and Songplays from the event log
    ///
    /// The catalog is read again here so this half can run on its own.
    pub async fn process_log_data(&self) -> Result<Vec<WriteSummary>> {
        let log = self.reader.read_log_data().await?;
        info!(
            "Read {} log events from {} files",
            log.num_rows(),
            log.num_partitions()
        );

        let plays = prepare_log(&log, self.zone)?;
        let timed: usize = plays.partitions().iter().map(count_start_times).sum();
        debug!(
            "{} NextSong events, {} with a start_time",
            plays.num_rows(),
            timed
        );

        let users = resolve_users(&plays)?;
        let users = self.write(TableName::Users, &users).await?;

        let time = extract_time(&plays)?;
        let time = self.write(TableName::Time, &time).await?;

        let catalog = self.reader.read_song_data().await?;
        let songplays = assemble_songplays(&plays, &catalog).await?;
        let unmatched: usize = songplays.partitions().iter().map(count_unmatched).sum();
        if unmatched > 0 {
            warn!(
                "{} of {} songplays have no catalog match",
                unmatched,
                songplays.num_rows()
            );
        }
        let songplays = self.write(TableName::Songplays, &songplays).await?;

        Ok(vec![users, time, songplays])
    }

    async fn write(&self, name: TableName, table: &Table) -> Result<WriteSummary> {
        let summary = self
            .sink
            .write_table(table, &WriteSpec::for_table(name))
            .await?;
        info!(
            "Wrote {}: {} rows in {} partitions",
            name, summary.rows, summary.partitions
        );
        Ok(summary)
    }
}
