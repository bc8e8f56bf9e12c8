//! Login, logout and session identity.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    error::{AppError, clear_sentry_user},
    middleware::{RequireAuth, clear_current_user, set_current_user},
    models::CurrentUser,
    services::AuthService,
    state::AppState,
};

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns 401 for bad credentials or an inactive account.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<CurrentUser>, AppError> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    set_current_user(&session, &user).await.map_err(|e| {
        tracing::error!("Failed to store session: {e}");
        AppError::Internal("session store unavailable".to_string())
    })?;

    Ok(Json(user))
}

/// Log out and drop the session.
///
/// # Errors
///
/// Returns 500 if the session cannot be cleared.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_user(&session).await.map_err(|e| {
        tracing::error!("Failed to clear session: {e}");
        AppError::Internal("session store unavailable".to_string())
    })?;
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}
