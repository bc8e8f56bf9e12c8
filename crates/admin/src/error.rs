//! Unified error handling for the admin API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use gazetteer_core::{EmailError, ValueError};

use crate::db::RepositoryError;
use crate::services::{AuthError, DirectoryError};

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Directory operation failed.
    #[error("{0}")]
    Directory(#[from] DirectoryError),

    /// Authentication or user management failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValueError> for AppError {
    fn from(e: ValueError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<EmailError> for AppError {
    fn from(e: EmailError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Directory(e) => match e {
                DirectoryError::AddressNotFound(_)
                | DirectoryError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                DirectoryError::AddressInUse(_)
                | DirectoryError::Cascade(_)
                | DirectoryError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                DirectoryError::Hierarchy(_) => StatusCode::BAD_REQUEST,
                DirectoryError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(e) => match e {
                AuthError::InvalidEmail(_) | AuthError::WeakPassword { .. } => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::InvalidCredentials | AuthError::Inactive => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists
                | AuthError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                AuthError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Set the Sentry user context from a user ID.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use gazetteer_core::{AddressId, CascadeError, HierarchyError};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("address 12".to_string());
        assert_eq!(err.to_string(), "Not found: address 12");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("taken".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_directory_errors() {
        let id = AddressId::new(1);
        assert_eq!(
            get_status(DirectoryError::AddressNotFound(id).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(DirectoryError::AddressInUse(id).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(DirectoryError::Hierarchy(HierarchyError::SelfParent { node: id }).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(DirectoryError::Cascade(CascadeError::TooLarge { limit: 10 }).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AuthError::Inactive.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::WeakPassword { min: 8 }.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_value_errors_are_bad_requests() {
        let err: AppError = ValueError::Empty { field: "name" }.into();
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }
}
