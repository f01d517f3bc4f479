use crate::domain::{Item, NewItem};
use async_trait::async_trait;
use thiserror::Error;

pub mod executor;
pub mod sqlite;

pub type StoreResult<T> = Result<T, StoreError>;

/// Data access failures. "No row" is never an error: lookups return `Ok(None)`
/// and writes report whether a row matched.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("statement produced {actual} where {expected} was requested")]
    UnexpectedOutcome {
        expected: &'static str,
        actual: &'static str,
    },
}

// an item repository can be shared between handlers (sqlx::Pool is thread safe)
// handlers only see this trait, so tests can hand them a mock
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Item>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Item>>;
    async fn list_items(&self) -> StoreResult<Vec<Item>>;

    // write operations
    async fn save_item(&self, item: &NewItem) -> StoreResult<Item>;
    /// Returns `false` when no row has `id`.
    async fn update_item(&self, id: i64, item: &NewItem) -> StoreResult<bool>;
    /// Returns `false` when no row has `id`.
    async fn delete_item(&self, id: i64) -> StoreResult<bool>;
}
