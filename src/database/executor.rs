use super::{StoreError, StoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Pool, Sqlite, SqliteConnection};
use tracing::{debug, error};

/// A bindable SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    None,
    One,
    All,
}

/// What a statement produced, shaped by the requested [`Fetch`].
pub enum QueryOutcome {
    Affected(u64),
    Row(Option<SqliteRow>),
    Rows(Vec<SqliteRow>),
}

impl QueryOutcome {
    fn kind(&self) -> &'static str {
        match self {
            QueryOutcome::Affected(_) => "affected count",
            QueryOutcome::Row(_) => "row",
            QueryOutcome::Rows(_) => "rows",
        }
    }

    pub fn rows_affected(self) -> StoreResult<u64> {
        match self {
            QueryOutcome::Affected(count) => Ok(count),
            other => Err(StoreError::UnexpectedOutcome {
                expected: "affected count",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_row(self) -> StoreResult<Option<SqliteRow>> {
        match self {
            QueryOutcome::Row(row) => Ok(row),
            other => Err(StoreError::UnexpectedOutcome {
                expected: "row",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_rows(self) -> StoreResult<Vec<SqliteRow>> {
        match self {
            QueryOutcome::Rows(rows) => Ok(rows),
            other => Err(StoreError::UnexpectedOutcome {
                expected: "rows",
                actual: other.kind(),
            }),
        }
    }
}

/// A single parameterized statement plus what to do with it.
#[derive(Debug, Clone)]
pub struct Statement<'s> {
    sql: &'s str,
    params: Vec<SqlValue>,
    fetch: Fetch,
    commit: bool,
}

impl<'s> Statement<'s> {
    pub fn new(sql: &'s str) -> Self {
        Self {
            sql,
            params: Vec::new(),
            fetch: Fetch::None,
            commit: false,
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn fetch(mut self, fetch: Fetch) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn commit(mut self) -> Self {
        self.commit = true;
        self
    }
}

// the pool is the connection provider; each execute owns one connection for its duration
#[derive(Clone)]
pub struct QueryExecutor {
    pool: Pool<Sqlite>,
}

impl QueryExecutor {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Runs `statement` once inside its own transaction, committed only when the
    /// statement asked for it. The connection goes back to the pool when this
    /// returns, whatever the outcome.
    pub async fn execute(&self, statement: Statement<'_>) -> StoreResult<QueryOutcome> {
        debug!(sql = statement.sql, params = statement.params.len(), "executing statement");

        let result = self.run(&statement).await;
        if let Err(e) = &result {
            error!(sql = statement.sql, error = %e, "statement failed");
        }
        result
    }

    async fn run(&self, statement: &Statement<'_>) -> StoreResult<QueryOutcome> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let outcome = run_on(&mut tx, statement).await?;
        if statement.commit {
            tx.commit().await?;
        }

        Ok(outcome)
    }
}

async fn run_on(conn: &mut SqliteConnection, statement: &Statement<'_>) -> StoreResult<QueryOutcome> {
    let mut query = sqlx::query(statement.sql);
    for param in &statement.params {
        query = match param {
            SqlValue::Integer(value) => query.bind(*value),
            SqlValue::Real(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
        };
    }

    let outcome = match statement.fetch {
        Fetch::None => QueryOutcome::Affected(query.execute(&mut *conn).await?.rows_affected()),
        Fetch::One => QueryOutcome::Row(query.fetch_optional(&mut *conn).await?),
        Fetch::All => QueryOutcome::Rows(query.fetch_all(&mut *conn).await?),
    };

    Ok(outcome)
}
