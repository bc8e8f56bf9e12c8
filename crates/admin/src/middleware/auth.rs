//! Authentication extractor and session helpers.
//!
//! Every `/api/*` handler takes [`RequireAuth`]. The session only proves who
//! logged in; the user is re-read on each request so deactivation and
//! deletion take effect immediately.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires an authenticated, active user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> String {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but missing.
#[derive(Debug)]
pub enum AuthRejection {
    /// No session, no user in it, or the user is gone or inactive.
    Unauthorized,
    /// The user could not be re-checked.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication required" })),
            )
                .into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let current: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection::Unauthorized)?;

        let user = UserRepository::new(state.pool())
            .get(current.id)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %current.id, "Failed to re-check session user: {e}");
                AuthRejection::Unavailable
            })?;

        match user {
            Some(user) if user.active => {
                set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
                Ok(Self(current))
            }
            _ => {
                if let Err(e) = session
                    .remove::<CurrentUser>(session_keys::CURRENT_USER)
                    .await
                {
                    tracing::warn!(user_id = %current.id, "Failed to drop stale session user: {e}");
                }
                Err(AuthRejection::Unauthorized)
            }
        }
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
