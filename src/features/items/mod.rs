pub mod error;
pub mod model;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::domain::Item;
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::get,
};
use model::{CreatedItem, MessageBody, parse_item_payload};
use serde_json::Value;
use tracing::info;

pub use error::ApiError;

pub fn items_router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items_handler).post(create_item_handler))
        .route("/items/", get(list_items_handler).post(create_item_handler))
        .route(
            "/items/{id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
}

// ids that are not integers never name an item
fn item_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid item data: {}", rejection.body_text())))
}

async fn list_items_handler(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .items
        .list_items()
        .await
        .map_err(ApiError::store("Failed to fetch items"))?;

    Ok(Json(items))
}

async fn create_item_handler(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedItem>), ApiError> {
    let new_item = parse_item_payload(json_body(body)?)?;

    let item = state
        .items
        .save_item(&new_item)
        .await
        .map_err(ApiError::store("Failed to create item"))?;

    info!(id = item.id, subject = %claims.sub, "created {}", item);
    Ok((StatusCode::CREATED, Json(CreatedItem { id: item.id })))
}

async fn get_item_handler(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Item>, ApiError> {
    let id = item_id(path)?;

    match state.items.find_by_id(id).await {
        Err(e) => Err(ApiError::store("Failed to fetch item")(e)),

        Ok(None) => Err(ApiError::NotFound),

        Ok(Some(item)) => Ok(Json(item)),
    }
}

async fn update_item_handler(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = item_id(path)?;
    let new_item = parse_item_payload(json_body(body)?)?;

    let updated = state
        .items
        .update_item(id, &new_item)
        .await
        .map_err(ApiError::store("Failed to update item"))?;

    if !updated {
        return Err(ApiError::NotFound);
    }

    info!(id, subject = %claims.sub, "updated item");
    Ok(Json(MessageBody::new("Item updated")))
}

async fn delete_item_handler(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = item_id(path)?;

    let deleted = state
        .items
        .delete_item(id)
        .await
        .map_err(ApiError::store("Failed to delete item"))?;

    if !deleted {
        return Err(ApiError::NotFound);
    }

    info!(id, subject = %claims.sub, "deleted item");
    Ok(Json(MessageBody::new("Item deleted")))
}
