use crate::database::executor::{Fetch, QueryExecutor, Statement};
use crate::database::{ItemRepository, StoreError, StoreResult};
use crate::domain::{Item, NewItem};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Pool, Row, Sqlite};

pub struct SqliteRepository {
    executor: QueryExecutor,
}

impl SqliteRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            executor: QueryExecutor::new(pool),
        }
    }
}

fn to_item(row: Option<SqliteRow>) -> StoreResult<Option<Item>> {
    match row {
        Some(row) => Ok(Some(Item::from_row(&row)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl ItemRepository for SqliteRepository {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Item>> {
        let row = self
            .executor
            .execute(
                Statement::new("SELECT * FROM items WHERE name = ? ORDER BY id LIMIT 1")
                    .bind(name)
                    .fetch(Fetch::One),
            )
            .await?
            .into_row()?;

        to_item(row)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
        let row = self
            .executor
            .execute(
                Statement::new("SELECT * FROM items WHERE id = ?")
                    .bind(id)
                    .fetch(Fetch::One),
            )
            .await?
            .into_row()?;

        to_item(row)
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let rows = self
            .executor
            .execute(Statement::new("SELECT * FROM items ORDER BY id").fetch(Fetch::All))
            .await?
            .into_rows()?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(Item::from_row(&row)?);
        }

        Ok(items)
    }

    async fn save_item(&self, item: &NewItem) -> StoreResult<Item> {
        let row = self
            .executor
            .execute(
                Statement::new(
                    "INSERT INTO items (name, description, price) VALUES (?, ?, ?) RETURNING id",
                )
                .bind(item.name.as_str())
                .bind(item.description.as_str())
                .bind(item.price)
                .fetch(Fetch::One)
                .commit(),
            )
            .await?
            .into_row()?
            .ok_or(StoreError::UnexpectedOutcome {
                expected: "generated id",
                actual: "no row",
            })?;

        let id: i64 = row.try_get("id")?;
        Ok(item.clone().with_id(id))
    }

    async fn update_item(&self, id: i64, item: &NewItem) -> StoreResult<bool> {
        let affected = self
            .executor
            .execute(
                Statement::new(
                    "UPDATE items SET name = ?, description = ?, price = ? WHERE id = ?",
                )
                .bind(item.name.as_str())
                .bind(item.description.as_str())
                .bind(item.price)
                .bind(id)
                .commit(),
            )
            .await?
            .rows_affected()?;

        Ok(affected > 0)
    }

    async fn delete_item(&self, id: i64) -> StoreResult<bool> {
        let affected = self
            .executor
            .execute(Statement::new("DELETE FROM items WHERE id = ?").bind(id).commit())
            .await?
            .rows_affected()?;

        Ok(affected > 0)
    }
}
