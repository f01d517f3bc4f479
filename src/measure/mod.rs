//! Query timing harness.
//!
//! For each record count, times a bounded select, a batched insert of that many
//! synthetic items, and chunked update and delete statements over the inserted
//! ids. Update and delete chunks run concurrently, each on its own connection.

use crate::database::StoreError;
use clap::ValueEnum;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub mod chunks;
pub mod harness;
pub mod report;

pub use chunks::IdRange;
pub use harness::{ChunkFailure, TimingHarness};
pub use report::render_table;

pub const DEFAULT_RECORD_COUNTS: [usize; 4] = [10, 100, 1000, 2000];
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// What to do when a chunk of a concurrent update or delete fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Stop every outstanding chunk and fail the measurement.
    AbortAll,
    /// Run every chunk and report the failures alongside the timing.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Millis,
}

impl TimeUnit {
    /// Converts to this unit, rounded to two decimals.
    pub fn round(self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        let value = match self {
            TimeUnit::Seconds => secs,
            TimeUnit::Minutes => secs / 60.0,
            TimeUnit::Millis => secs * 1000.0,
        };
        (value * 100.0).round() / 100.0
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Millis => "ms",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub insert_batch_size: usize,
    pub chunk_size: usize,
    pub workers: usize,
    pub policy: FailurePolicy,
}

/// Same sizing as a default thread pool: a few more workers than cores, capped at 32.
pub fn default_workers() -> usize {
    (num_cpus::get() + 4).min(32)
}

#[derive(Debug, Error)]
pub enum MeasureError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{operation} aborted: {failure}")]
    ChunkFailed {
        operation: &'static str,
        failure: ChunkFailure,
    },
}

/// One line of the result table.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub records: usize,
    pub select: Duration,
    pub insert: Duration,
    pub update: Duration,
    pub delete: Duration,
    /// Chunks lost under best-effort; zero otherwise.
    pub update_failures: usize,
    pub delete_failures: usize,
}

impl Measurement {
    pub fn has_failures(&self) -> bool {
        self.update_failures > 0 || self.delete_failures > 0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: select {:?}, insert {:?}, update {:?}, delete {:?}",
            self.records, self.select, self.insert, self.update, self.delete
        )
    }
}

pub async fn run_measurements(
    harness: &TimingHarness,
    record_counts: &[usize],
) -> Result<Vec<Measurement>, MeasureError> {
    let mut rows = Vec::with_capacity(record_counts.len());

    for &records in record_counts {
        info!(records, "starting measurements");

        let select = harness.time_select().await?;
        let (insert, ids) = harness.time_insert(records).await?;
        let update = harness.time_update(&ids).await?;
        let delete = harness.time_delete(&ids).await?;

        for (operation, report) in [("update", &update), ("delete", &delete)] {
            if !report.failures.is_empty() {
                warn!(
                    operation,
                    failed = report.failures.len(),
                    chunks = report.chunks,
                    "chunks failed during best-effort run"
                );
            }
        }

        let row = Measurement {
            records,
            select,
            insert,
            update: update.elapsed,
            delete: delete.elapsed,
            update_failures: update.failures.len(),
            delete_failures: delete.failures.len(),
        };
        info!("{}", row);
        rows.push(row);
    }

    Ok(rows)
}
