//! Item API Endpoints

use crate::auth::middleware::CurrentUser;
use crate::db::StoreError;
use crate::items::{
    models::{CreateItemRequest, Item, UpdateItemRequest},
    store::ItemStore,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use validator::Validate;

pub type ItemState = Arc<dyn ItemStore>;

/// `{"data": ...}` envelope used by every item response.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// GET /items
pub async fn list_items(
    State(items): State<ItemState>,
) -> Result<Json<Data<Vec<Item>>>, ItemApiError> {
    Ok(Json(Data {
        data: items.find_all()?,
    }))
}

/// GET /items/:id
pub async fn get_item(
    State(items): State<ItemState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Data<Item>>, ItemApiError> {
    let Path(id) = id.map_err(|_| ItemApiError::InvalidId)?;
    let item = items.find_by_id(id, user.id)?.ok_or(ItemApiError::NotFound)?;
    Ok(Json(Data { data: item }))
}

/// POST /items
pub async fn create_item(
    State(items): State<ItemState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Data<Item>>), ItemApiError> {
    let Json(payload) = payload.map_err(|_| ItemApiError::InvalidInput)?;
    payload.validate().map_err(|_| ItemApiError::InvalidInput)?;

    let item = items.create(user.id, &payload)?;
    Ok((StatusCode::CREATED, Json(Data { data: item })))
}

/// PUT /items/:id
pub async fn update_item(
    State(items): State<ItemState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<Data<Item>>, ItemApiError> {
    let Path(id) = id.map_err(|_| ItemApiError::InvalidId)?;
    let Json(patch) = payload.map_err(|_| ItemApiError::InvalidInput)?;
    if patch.is_empty() || patch.validate().is_err() {
        return Err(ItemApiError::InvalidInput);
    }

    let item = items.update(id, user.id, &patch)?;
    Ok(Json(Data { data: item }))
}

/// DELETE /items/:id (admin only)
pub async fn delete_item(
    State(items): State<ItemState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ItemApiError> {
    let Path(id) = id.map_err(|_| ItemApiError::InvalidId)?;
    items.delete(id)?;
    Ok(StatusCode::OK)
}

/// Item API errors
#[derive(Debug)]
pub enum ItemApiError {
    InvalidId,
    InvalidInput,
    NotFound,
    InternalError,
}

impl From<StoreError> for ItemApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ItemApiError::NotFound,
            other => {
                error!("Item store error: {}", other);
                ItemApiError::InternalError
            }
        }
    }
}

impl IntoResponse for ItemApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ItemApiError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid id"),
            ItemApiError::InvalidInput => (StatusCode::BAD_REQUEST, "Invalid input"),
            ItemApiError::NotFound => (StatusCode::NOT_FOUND, "Item not found"),
            ItemApiError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
