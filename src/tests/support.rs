use crate::AppState;
use crate::auth::TokenAuthority;
use crate::database::sqlite::SqliteRepository;
use crate::database::{ItemRepository, StoreError, StoreResult};
use crate::db::connect_pool;
use crate::domain::{Item, NewItem};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_only";

// a fresh in-memory database per test
// one connection only: every sqlite::memory: connection is its own database
pub async fn setup_test_pool() -> Pool<Sqlite> {
    connect_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to create in-memory database")
}

pub fn test_authority() -> Arc<TokenAuthority> {
    Arc::new(TokenAuthority::new(TEST_SECRET, chrono::Duration::minutes(15)))
}

pub fn bearer(authority: &TokenAuthority) -> String {
    format!("Bearer {}", authority.issue("tester").unwrap())
}

pub async fn setup_api_test_state() -> AppState {
    let pool = setup_test_pool().await;
    AppState {
        items: Arc::new(SqliteRepository::new(pool)),
        tokens: test_authority(),
    }
}

pub fn widget() -> NewItem {
    NewItem::new("Widget", "A widget", 9.99)
}

// --- Manual Mock: ItemRepository ---
// every call fails the way a dropped database connection would
#[derive(Clone)]
pub struct FailingRepository;

fn closed() -> StoreError {
    StoreError::Database(sqlx::Error::PoolClosed)
}

#[async_trait]
impl ItemRepository for FailingRepository {
    async fn find_by_name(&self, _name: &str) -> StoreResult<Option<Item>> {
        Err(closed())
    }

    async fn find_by_id(&self, _id: i64) -> StoreResult<Option<Item>> {
        Err(closed())
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        Err(closed())
    }

    async fn save_item(&self, _item: &NewItem) -> StoreResult<Item> {
        Err(closed())
    }

    async fn update_item(&self, _id: i64, _item: &NewItem) -> StoreResult<bool> {
        Err(closed())
    }

    async fn delete_item(&self, _id: i64) -> StoreResult<bool> {
        Err(closed())
    }
}

pub fn failing_state() -> AppState {
    AppState {
        items: Arc::new(FailingRepository),
        tokens: test_authority(),
    }
}
