//! Role handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gazetteer_core::{RoleId, RoleName};

use crate::{
    db::{RepositoryError, RoleRepository},
    error::AppError,
    middleware::RequireAuth,
    models::Role,
    state::AppState,
};

/// Build the roles router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/roles", get(index).post(create))
        .route("/api/roles/{id}", delete(destroy))
}

/// Role view; the label is the role name.
#[derive(Debug, Serialize)]
pub struct RoleView {
    pub id: RoleId,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            label: role.name.clone(),
            name: role.name,
            description: role.description,
        }
    }
}

/// Create request.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

/// List all roles.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<RoleView>>, AppError> {
    let roles = RoleRepository::new(state.pool(), state.directory().unique_role_names)
        .list()
        .await?;
    Ok(Json(roles.into_iter().map(Into::into).collect()))
}

/// Create a role.
///
/// # Errors
///
/// Returns 400 for an invalid name and 409 for a taken one.
#[instrument(skip(_user, state))]
pub async fn create(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleView>), AppError> {
    let name = RoleName::parse(&body.name)?;
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let role = RoleRepository::new(state.pool(), state.directory().unique_role_names)
        .create(&name, description)
        .await?;

    tracing::info!(role_id = %role.id, "Role created");
    Ok((StatusCode::CREATED, Json(role.into())))
}

/// Delete a role; users holding it lose it.
///
/// # Errors
///
/// Returns 404 if the role doesn't exist.
#[instrument(skip(_user, state))]
pub async fn destroy(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<StatusCode, AppError> {
    RoleRepository::new(state.pool(), state.directory().unique_role_names)
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("role {id}")),
            other => other.into(),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
