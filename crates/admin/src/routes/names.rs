//! Registry-wide name and full-name listings.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use gazetteer_core::{AddressId, FullNameId, NameId};

use crate::{
    db::{FullNameRepository, NameRepository},
    error::AppError,
    middleware::RequireAuth,
    models::{FullNameEntry, NameEntry},
    state::AppState,
};

/// Build the registry router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/names", get(list_names))
        .route("/api/full-names", get(list_full_names))
}

/// Registered name view; the label is the name itself.
#[derive(Debug, Serialize)]
pub struct NameView {
    pub id: NameId,
    pub address_id: AddressId,
    pub name: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl From<NameEntry> for NameView {
    fn from(entry: NameEntry) -> Self {
        Self {
            id: entry.id,
            address_id: entry.address_id,
            label: entry.name.clone(),
            name: entry.name,
            created_at: entry.created_at,
        }
    }
}

/// Full-name view; the label is the full name itself.
#[derive(Debug, Serialize)]
pub struct FullNameView {
    pub id: FullNameId,
    pub address_id: AddressId,
    pub full_name: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl From<FullNameEntry> for FullNameView {
    fn from(entry: FullNameEntry) -> Self {
        Self {
            id: entry.id,
            address_id: entry.address_id,
            label: entry.full_name.clone(),
            full_name: entry.full_name,
            created_at: entry.created_at,
        }
    }
}

/// Every registered name.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn list_names(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<NameView>>, AppError> {
    let names = NameRepository::new(state.pool()).list().await?;
    Ok(Json(names.into_iter().map(Into::into).collect()))
}

/// Every materialized full name.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn list_full_names(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<FullNameView>>, AppError> {
    let entries = FullNameRepository::new(state.pool()).list().await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
