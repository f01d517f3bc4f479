use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

/// A stored row of the `items` table. `id` is assigned by the database on insert
/// and never written by the application afterwards.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Display)]
#[display("Item(name={}, price={}, description={})", name, price, description)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// The mutable columns of an item, used for both create and full-row update.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl NewItem {
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
        }
    }

    pub fn with_id(self, id: i64) -> Item {
        Item {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
        }
    }
}
