//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database reachable)
//! GET  /                               - Redirect to /api/addresses
//!
//! # Auth
//! POST /auth/login                     - Password login
//! POST /auth/logout                    - Logout
//! GET  /auth/me                        - Current session user
//!
//! # Addresses
//! GET  /api/addresses                  - List with labels
//! POST /api/addresses                  - Create
//! GET  /api/addresses/{id}             - Detail
//! DELETE /api/addresses/{id}           - Delete (only if unreferenced)
//! PUT  /api/addresses/{id}/parent      - Reparent
//! GET  /api/addresses/{id}/ancestors   - Chain up to the root
//! GET  /api/addresses/{id}/children    - Direct children
//! GET  /api/addresses/{id}/names       - Name history
//! POST /api/addresses/{id}/names       - Register a name (cascades)
//! GET  /api/addresses/{id}/full-names  - Full-name history
//!
//! # Registry
//! GET  /api/names                      - Every registered name
//! GET  /api/full-names                 - Every full name
//!
//! # Items
//! GET/POST /api/items, GET/PUT/DELETE /api/items/{id}
//!
//! # Users & roles
//! GET/POST /api/users, GET/DELETE /api/users/{id}
//! PUT  /api/users/{id}/active, POST /api/users/{id}/confirm
//! PUT/DELETE /api/users/{id}/roles/{role_id}
//! GET/POST /api/roles, DELETE /api/roles/{id}
//! ```

pub mod addresses;
pub mod auth;
pub mod items;
pub mod names;
pub mod roles;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::get,
};

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/", get(|| async { Redirect::to("/api/addresses") }))
        .merge(auth::router())
        .merge(addresses::router())
        .merge(names::router())
        .merge(items::router())
        .merge(users::router())
        .merge(roles::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
