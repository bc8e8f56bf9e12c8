//! Catalog item handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gazetteer_core::{AddressId, ItemId, ItemName};

use crate::{
    db::{ItemRepository, RepositoryError},
    error::AppError,
    middleware::RequireAuth,
    models::Item,
    state::AppState,
};

/// Build the items router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(index).post(create))
        .route("/api/items/{id}", get(show).put(update).delete(destroy))
}

/// Item view; the label is the item name.
#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub name: String,
    pub label: String,
    pub address_id: AddressId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            label: item.name.clone(),
            name: item.name,
            address_id: item.address_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Create or update request.
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub address_id: AddressId,
}

fn repository(state: &AppState) -> ItemRepository<'_> {
    ItemRepository::new(state.pool(), state.directory().unique_item_names)
}

fn not_found(id: ItemId) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("item {id}")),
        other => other.into(),
    }
}

/// List all items.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemView>>, AppError> {
    let items = repository(&state).list().await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Create an item.
///
/// # Errors
///
/// Returns 400 for an empty name and 409 for a taken name or unknown address.
#[instrument(skip(_user, state))]
pub async fn create(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<ItemRequest>,
) -> Result<(StatusCode, Json<ItemView>), AppError> {
    let name = ItemName::parse(&body.name)?;
    let item = repository(&state).create(&name, body.address_id).await?;

    tracing::info!(item_id = %item.id, "Item created");
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Show one item.
///
/// # Errors
///
/// Returns 404 if the item doesn't exist.
#[instrument(skip(_user, state))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<ItemView>, AppError> {
    repository(&state)
        .get(id)
        .await?
        .map(|item| Json(item.into()))
        .ok_or_else(|| AppError::NotFound(format!("item {id}")))
}

/// Rename or move an item.
///
/// # Errors
///
/// Returns 404 if the item doesn't exist and 409 for a taken name.
#[instrument(skip(_user, state))]
pub async fn update(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(body): Json<ItemRequest>,
) -> Result<Json<ItemView>, AppError> {
    let name = ItemName::parse(&body.name)?;
    let item = repository(&state)
        .update(id, &name, body.address_id)
        .await
        .map_err(not_found(id))?;

    Ok(Json(item.into()))
}

/// Delete an item.
///
/// # Errors
///
/// Returns 404 if the item doesn't exist.
#[instrument(skip(_user, state))]
pub async fn destroy(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<StatusCode, AppError> {
    repository(&state).delete(id).await.map_err(not_found(id))?;

    tracing::info!(item_id = %id, "Item deleted");
    Ok(StatusCode::NO_CONTENT)
}
