//! User management handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gazetteer_core::{Email, RoleId, UserId};

use crate::{
    db::{RepositoryError, UserRepository},
    error::AppError,
    middleware::RequireAuth,
    models::User,
    services::AuthService,
    state::AppState,
};

use super::roles::RoleView;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(index).post(create))
        .route("/api/users/{id}", get(show).delete(destroy))
        .route("/api/users/{id}/active", put(set_active))
        .route("/api/users/{id}/confirm", post(confirm))
        .route(
            "/api/users/{id}/roles/{role_id}",
            put(assign_role).delete(revoke_role),
        )
}

/// User view; the label is the email. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: Email,
    pub label: String,
    pub active: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleView>>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            label: user.email.to_string(),
            email: user.email,
            active: user.active,
            confirmed_at: user.confirmed_at,
            created_at: user.created_at,
            roles: None,
        }
    }
}

/// Create request.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

/// Activation request.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

fn not_found(id: UserId) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("user {id}")),
        other => other.into(),
    }
}

/// List all users.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, AppError> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Create a user.
///
/// # Errors
///
/// Returns 400 for an invalid email or short password and 409 if the email is
/// taken.
#[instrument(skip(_user, state, body), fields(email = %body.email))]
pub async fn create(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = AuthService::new(state.pool())
        .create_user(&body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Show one user with their roles.
///
/// # Errors
///
/// Returns 404 if the user doesn't exist.
#[instrument(skip(_user, state))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserView>, AppError> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    let roles = users.roles_for(id).await?;

    let mut view = UserView::from(user);
    view.roles = Some(roles.into_iter().map(Into::into).collect());
    Ok(Json(view))
}

/// Delete a user.
///
/// # Errors
///
/// Returns 404 if the user doesn't exist and 400 when deleting yourself.
#[instrument(skip(current, state))]
pub async fn destroy(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    if current.id == id {
        return Err(AppError::BadRequest(
            "cannot delete the logged-in user".to_string(),
        ));
    }

    UserRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found(id))?;

    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Activate or deactivate a user.
///
/// # Errors
///
/// Returns 404 if the user doesn't exist.
#[instrument(skip(_user, state))]
pub async fn set_active(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<SetActiveRequest>,
) -> Result<Json<UserView>, AppError> {
    let user = UserRepository::new(state.pool())
        .set_active(id, body.active)
        .await
        .map_err(not_found(id))?;
    Ok(Json(user.into()))
}

/// Mark a user as confirmed.
///
/// # Errors
///
/// Returns 404 if the user doesn't exist.
#[instrument(skip(_user, state))]
pub async fn confirm(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserView>, AppError> {
    let user = UserRepository::new(state.pool())
        .confirm(id)
        .await
        .map_err(not_found(id))?;
    Ok(Json(user.into()))
}

/// Give a role to a user. Idempotent.
///
/// # Errors
///
/// Returns 409 if the user or role doesn't exist.
#[instrument(skip(_user, state))]
pub async fn assign_role(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((id, role_id)): Path<(UserId, RoleId)>,
) -> Result<StatusCode, AppError> {
    UserRepository::new(state.pool())
        .assign_role(id, role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take a role away from a user.
///
/// # Errors
///
/// Returns 404 if the user did not hold the role.
#[instrument(skip(_user, state))]
pub async fn revoke_role(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((id, role_id)): Path<(UserId, RoleId)>,
) -> Result<StatusCode, AppError> {
    UserRepository::new(state.pool())
        .revoke_role(id, role_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(format!("user {id} does not hold role {role_id}"))
            }
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}
