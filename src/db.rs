use anyhow::{Context, Result};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::Pool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

// concurrent writers wait on each other instead of failing with SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates the database if it is missing, opens a pool on it and runs migrations.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<Pool<Sqlite>> {
    // verify db exists
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!(database_url, "database missing, creating");
        Sqlite::create_database(database_url)
            .await
            .with_context(|| format!("Unable to create database at {}", database_url))?;
    }

    let mut options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database url {}", database_url))?
        .busy_timeout(BUSY_TIMEOUT);

    if !database_url.contains(":memory:") {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to create pool on {}", database_url))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!(database_url, max_connections, "database ready");
    Ok(pool)
}
