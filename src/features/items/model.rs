use crate::domain::NewItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

pub const REQUIRED_KEYS: [&str; 3] = ["name", "description", "price"];

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct CreatedItem {
    pub id: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// a body is acceptable when it is an object holding every required key with the right JSON type
// extra keys (including "id") are ignored
pub fn parse_item_payload(payload: Value) -> Result<NewItem, ApiError> {
    let Some(object) = payload.as_object() else {
        return Err(ApiError::BadRequest(
            "Invalid item data: expected a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();

    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid item data: missing {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value::<NewItem>(payload)
        .map_err(|e| ApiError::BadRequest(format!("Invalid item data: {}", e)))
}
