//! Router tests that need no database.
//!
//! The offline app has no session layer, so every protected route must answer
//! 401 before touching the pool.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use gazetteer_integration_tests::offline_app;

async fn status_of(method: &str, uri: &str, body: Option<&str>) -> StatusCode {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_owned())
        }
        None => Body::empty(),
    };

    offline_app()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_health() {
    let response = offline_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    assert_eq!(
        status_of("GET", "/health/ready", None).await,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_root_redirects_to_addresses() {
    let response = offline_app()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/addresses"
    );
}

#[tokio::test]
async fn test_api_requires_login() {
    let cases = [
        ("GET", "/api/addresses", None),
        ("POST", "/api/addresses", Some(r#"{"type": "country"}"#)),
        ("GET", "/api/addresses/1", None),
        ("DELETE", "/api/addresses/1", None),
        ("PUT", "/api/addresses/1/parent", Some(r#"{"parent_id": null}"#)),
        ("GET", "/api/addresses/1/ancestors", None),
        ("GET", "/api/addresses/1/children", None),
        ("GET", "/api/addresses/1/names", None),
        ("POST", "/api/addresses/1/names", Some(r#"{"name": "Italy"}"#)),
        ("GET", "/api/addresses/1/full-names", None),
        ("GET", "/api/names", None),
        ("GET", "/api/full-names", None),
        ("GET", "/api/items", None),
        ("POST", "/api/items", Some(r#"{"name": "x", "address_id": 1}"#)),
        ("PUT", "/api/items/1", Some(r#"{"name": "x", "address_id": 1}"#)),
        ("DELETE", "/api/items/1", None),
        ("GET", "/api/users", None),
        ("POST", "/api/users", Some(r#"{"email": "a@b.c", "password": "12345678"}"#)),
        ("PUT", "/api/users/1/active", Some(r#"{"active": false}"#)),
        ("POST", "/api/users/1/confirm", None),
        ("PUT", "/api/users/1/roles/2", None),
        ("DELETE", "/api/users/1/roles/2", None),
        ("GET", "/api/roles", None),
        ("POST", "/api/roles", Some(r#"{"name": "editor"}"#)),
        ("DELETE", "/api/roles/1", None),
        ("GET", "/auth/me", None),
    ];

    for (method, uri, body) in cases {
        assert_eq!(
            status_of(method, uri, body).await,
            StatusCode::UNAUTHORIZED,
            "{method} {uri}"
        );
    }
}

#[tokio::test]
async fn test_unauthorized_body_is_json() {
    let response = offline_app()
        .oneshot(Request::get("/api/addresses").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "authentication required");
}

#[tokio::test]
async fn test_unknown_route() {
    assert_eq!(
        status_of("GET", "/api/unknown", None).await,
        StatusCode::NOT_FOUND
    );
}
