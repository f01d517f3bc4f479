use super::{FailurePolicy, HarnessConfig, IdRange, MeasureError};
use crate::database::executor::{Fetch, QueryExecutor, Statement};
use crate::domain::NewItem;
use sqlx::{Connection, Pool, QueryBuilder, Sqlite};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

const SELECT_SQL: &str = "SELECT * FROM items LIMIT 1000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedStatement {
    Update,
    Delete,
}

impl ChunkedStatement {
    fn name(self) -> &'static str {
        match self {
            ChunkedStatement::Update => "update",
            ChunkedStatement::Delete => "delete",
        }
    }

    // the id list and closing paren are appended per chunk
    fn prefix(self) -> &'static str {
        match self {
            ChunkedStatement::Update => "UPDATE items SET price = price + 10 WHERE id IN (",
            ChunkedStatement::Delete => "DELETE FROM items WHERE id IN (",
        }
    }
}

/// A chunk that did not complete. `chunk` is `None` when the task died before
/// reporting which chunk it held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub chunk: Option<usize>,
    pub message: String,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chunk {
            Some(chunk) => write!(f, "chunk {}: {}", chunk, self.message),
            None => write!(f, "unknown chunk: {}", self.message),
        }
    }
}

/// Per-chunk outcome of a concurrent update or delete.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub chunks: usize,
    pub succeeded: usize,
    pub rows_affected: u64,
    pub failures: Vec<ChunkFailure>,
    pub elapsed: Duration,
}

type ChunkResult = (usize, Result<u64, sqlx::Error>);

pub struct TimingHarness {
    executor: QueryExecutor,
    config: HarnessConfig,
}

impl TimingHarness {
    pub fn new(pool: Pool<Sqlite>, config: HarnessConfig) -> Self {
        Self {
            executor: QueryExecutor::new(pool),
            config,
        }
    }

    fn pool(&self) -> &Pool<Sqlite> {
        self.executor.pool()
    }

    pub async fn time_select(&self) -> Result<Duration, MeasureError> {
        info!("running select");

        let start = Instant::now();
        let rows = self
            .executor
            .execute(Statement::new(SELECT_SQL).fetch(Fetch::All))
            .await?
            .into_rows()?;
        let elapsed = start.elapsed();

        debug!(rows = rows.len(), ?elapsed, "select finished");
        Ok(elapsed)
    }

    /// Inserts `records` synthetic items in multi-row batches on one connection
    /// and one transaction. Returns the time taken and the ids the rows received.
    pub async fn time_insert(&self, records: usize) -> Result<(Duration, IdRange), MeasureError> {
        info!(records, "running insert");

        let items = synthetic_items(records);
        let mut conn = self.pool().acquire().await?;

        let start = Instant::now();
        let mut tx = conn.begin().await?;

        // rowids continue from the current maximum, and this transaction is the only writer
        let max_id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM items")
            .fetch_one(&mut *tx)
            .await?;

        for batch in items.chunks(self.config.insert_batch_size.max(1)) {
            let mut builder =
                QueryBuilder::<Sqlite>::new("INSERT INTO items (name, description, price) ");
            builder.push_values(batch, |mut row, item| {
                row.push_bind(item.name.as_str())
                    .push_bind(item.description.as_str())
                    .push_bind(item.price);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        let elapsed = start.elapsed();

        debug!(records, ?elapsed, "insert finished");
        Ok((elapsed, IdRange::new(max_id + 1, records)))
    }

    pub async fn time_update(&self, ids: &IdRange) -> Result<BatchReport, MeasureError> {
        self.run_chunked(ChunkedStatement::Update, ids).await
    }

    pub async fn time_delete(&self, ids: &IdRange) -> Result<BatchReport, MeasureError> {
        self.run_chunked(ChunkedStatement::Delete, ids).await
    }

    // fork-join over at most `workers` concurrent chunks; a new chunk starts whenever one finishes
    async fn run_chunked(
        &self,
        kind: ChunkedStatement,
        ids: &IdRange,
    ) -> Result<BatchReport, MeasureError> {
        if ids.is_empty() {
            debug!(operation = kind.name(), "no ids to process");
            return Ok(BatchReport::default());
        }

        let chunks = ids.chunks(self.config.chunk_size);
        let workers = self.config.workers.max(1);
        info!(
            operation = kind.name(),
            first = ids.first,
            last = ?ids.last(),
            records = ids.count,
            chunks = chunks.len(),
            workers,
            "running chunked statement"
        );

        let mut report = BatchReport {
            chunks: chunks.len(),
            ..BatchReport::default()
        };
        let mut pending = chunks.into_iter().enumerate();
        let mut set: JoinSet<ChunkResult> = JoinSet::new();

        let start = Instant::now();
        for (index, chunk) in pending.by_ref().take(workers) {
            set.spawn(execute_chunk(self.pool().clone(), kind, index, chunk));
        }

        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok((_, Ok(affected))) => {
                    report.succeeded += 1;
                    report.rows_affected += affected;
                    None
                }
                Ok((index, Err(e))) => Some(ChunkFailure {
                    chunk: Some(index),
                    message: e.to_string(),
                }),
                Err(e) => Some(ChunkFailure {
                    chunk: None,
                    message: e.to_string(),
                }),
            };

            if let Some(failure) = failure {
                error!(operation = kind.name(), %failure, "chunk failed");

                if self.config.policy == FailurePolicy::AbortAll {
                    set.shutdown().await;
                    return Err(MeasureError::ChunkFailed {
                        operation: kind.name(),
                        failure,
                    });
                }
                report.failures.push(failure);
            }

            if let Some((index, chunk)) = pending.next() {
                set.spawn(execute_chunk(self.pool().clone(), kind, index, chunk));
            }
        }

        report.elapsed = start.elapsed();
        debug!(
            operation = kind.name(),
            rows = report.rows_affected,
            elapsed = ?report.elapsed,
            "chunked statement finished"
        );
        Ok(report)
    }
}

// each chunk owns its connection from acquire to commit
async fn execute_chunk(
    pool: Pool<Sqlite>,
    kind: ChunkedStatement,
    index: usize,
    ids: Vec<i64>,
) -> ChunkResult {
    let result: Result<u64, sqlx::Error> = async {
        let mut tx = pool.begin().await?;

        let mut builder = QueryBuilder::<Sqlite>::new(kind.prefix());
        {
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");
        }

        let affected = builder.build().execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;
        Ok(affected)
    }
    .await;

    (index, result)
}

pub fn synthetic_items(records: usize) -> Vec<NewItem> {
    (0..records)
        .map(|i| NewItem::new("Item", format!("Description for Item {}", i), 100.0))
        .collect()
}
