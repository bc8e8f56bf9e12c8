//! Address hierarchy and name registration handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gazetteer_core::{AddressId, AddressKind, PlaceName};

use crate::{
    db::{AddressRepository, FullNameRepository, NameRepository},
    error::AppError,
    middleware::RequireAuth,
    models::AddressSummary,
    services::DirectoryService,
    state::AppState,
};

use super::names::{FullNameView, NameView};

/// Build the addresses router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/addresses", get(index).post(create))
        .route("/api/addresses/{id}", get(show).delete(destroy))
        .route("/api/addresses/{id}/parent", put(set_parent))
        .route("/api/addresses/{id}/ancestors", get(ancestors))
        .route("/api/addresses/{id}/children", get(children))
        .route("/api/addresses/{id}/names", get(names).post(register_name))
        .route("/api/addresses/{id}/full-names", get(full_names))
}

/// Address view for the API.
#[derive(Debug, Serialize)]
pub struct AddressView {
    pub id: AddressId,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: Option<AddressId>,
    pub label: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AddressSummary> for AddressView {
    fn from(summary: AddressSummary) -> Self {
        let label = summary.label();
        Self {
            id: summary.address.id,
            kind: summary.address.kind,
            parent_id: summary.address.parent_id,
            label,
            full_name: summary.latest_full_name,
            created_at: summary.address.created_at,
        }
    }
}

/// Create request.
#[derive(Debug, Deserialize)]
pub struct CreateAddressRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: Option<AddressId>,
}

/// Reparent request; `null` makes the address a root.
#[derive(Debug, Deserialize)]
pub struct SetParentRequest {
    pub parent_id: Option<AddressId>,
}

/// Name registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterNameRequest {
    pub name: String,
}

/// Response to a name registration.
#[derive(Debug, Serialize)]
pub struct RegisterNameResponse {
    pub name: NameView,
    pub full_names: Vec<FullNameView>,
}

async fn summary_or_404(state: &AppState, id: AddressId) -> Result<AddressView, AppError> {
    AddressRepository::new(state.pool())
        .summary(id)
        .await?
        .map(AddressView::from)
        .ok_or_else(|| AppError::NotFound(format!("address {id}")))
}

async fn ensure_exists(state: &AppState, id: AddressId) -> Result<(), AppError> {
    AddressRepository::new(state.pool())
        .get(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("address {id}")))
}

/// List all addresses.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AddressView>>, AppError> {
    let addresses = AddressRepository::new(state.pool()).list().await?;
    Ok(Json(addresses.into_iter().map(Into::into).collect()))
}

/// Create an address.
///
/// # Errors
///
/// Returns 400 for an invalid type and 404 for an unknown parent.
#[instrument(skip(_user, state))]
pub async fn create(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<AddressView>), AppError> {
    let kind = AddressKind::parse(&body.kind)?;
    let address = DirectoryService::new(state.pool(), state.directory())
        .create_address(&kind, body.parent_id)
        .await?;

    let view = summary_or_404(&state, address.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Show one address.
///
/// # Errors
///
/// Returns 404 if the address doesn't exist.
#[instrument(skip(_user, state))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<AddressView>, AppError> {
    summary_or_404(&state, id).await.map(Json)
}

/// Delete an unreferenced address.
///
/// # Errors
///
/// Returns 404 if it doesn't exist and 409 while it is referenced.
#[instrument(skip(_user, state))]
pub async fn destroy(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<StatusCode, AppError> {
    DirectoryService::new(state.pool(), state.directory())
        .delete_address(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an address under another parent.
///
/// # Errors
///
/// Returns 400 if the move would create a cycle.
#[instrument(skip(_user, state))]
pub async fn set_parent(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
    Json(body): Json<SetParentRequest>,
) -> Result<Json<AddressView>, AppError> {
    DirectoryService::new(state.pool(), state.directory())
        .set_parent(id, body.parent_id)
        .await?;
    summary_or_404(&state, id).await.map(Json)
}

/// The address and every ancestor up to its root.
///
/// # Errors
///
/// Returns 404 if the address doesn't exist.
#[instrument(skip(_user, state))]
pub async fn ancestors(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Vec<AddressView>>, AppError> {
    let chain = AddressRepository::new(state.pool()).ancestors(id).await?;
    if chain.is_empty() {
        return Err(AppError::NotFound(format!("address {id}")));
    }
    Ok(Json(chain.into_iter().map(Into::into).collect()))
}

/// Direct children of an address.
///
/// # Errors
///
/// Returns 404 if the address doesn't exist.
#[instrument(skip(_user, state))]
pub async fn children(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Vec<AddressView>>, AppError> {
    ensure_exists(&state, id).await?;
    let children = AddressRepository::new(state.pool()).children(id).await?;
    Ok(Json(children.into_iter().map(Into::into).collect()))
}

/// Name history of an address, oldest first.
///
/// # Errors
///
/// Returns 404 if the address doesn't exist.
#[instrument(skip(_user, state))]
pub async fn names(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Vec<NameView>>, AppError> {
    ensure_exists(&state, id).await?;
    let names = NameRepository::new(state.pool()).for_address(id).await?;
    Ok(Json(names.into_iter().map(Into::into).collect()))
}

/// Register a new name; full names for the whole subtree follow.
///
/// # Errors
///
/// Returns 400 for an empty name, 404 for an unknown address and 409 if the
/// cascade cannot be applied.
#[instrument(skip(_user, state))]
pub async fn register_name(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
    Json(body): Json<RegisterNameRequest>,
) -> Result<(StatusCode, Json<RegisterNameResponse>), AppError> {
    let name = PlaceName::parse(&body.name)?;
    let registered = DirectoryService::new(state.pool(), state.directory())
        .register_name(id, &name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterNameResponse {
            name: registered.name.into(),
            full_names: registered.full_names.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// Full-name history of an address, oldest first.
///
/// # Errors
///
/// Returns 404 if the address doesn't exist.
#[instrument(skip(_user, state))]
pub async fn full_names(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Vec<FullNameView>>, AppError> {
    ensure_exists(&state, id).await?;
    let entries = FullNameRepository::new(state.pool()).for_address(id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
