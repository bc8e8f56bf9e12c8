//! Login and authenticated API requests over the full router, including the
//! Postgres session store. Skipped when `TEST_DATABASE_URL` is unset.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

use gazetteer_admin::db::UserRepository;
use gazetteer_admin::middleware::create_session_layer;
use gazetteer_admin::routes;
use gazetteer_admin::services::AuthService;
use gazetteer_admin::state::AppState;
use gazetteer_integration_tests::{test_config, test_pool, unique};

const PASSWORD: &str = "a long enough password";

fn app(pool: &PgPool) -> Router {
    let config = test_config("postgres://unused");
    let session_layer = create_session_layer(pool, &config).unwrap();
    routes::routes()
        .layer(session_layer)
        .with_state(AppState::new(config, pool.clone()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(request.body(body).unwrap()).await.unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, email: &str, password: &str) -> Response<Body> {
    send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_login_and_register_name_over_http() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool);
    let email = format!("{}@example.org", unique("http"));
    AuthService::new(&pool)
        .create_user(&email, PASSWORD)
        .await
        .unwrap();

    let response = login(&app, &email, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let me = send(&app, "GET", "/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(json_body(me).await["email"], email.as_str());

    let created = send(
        &app,
        "POST",
        "/api/addresses",
        Some(&cookie),
        Some(json!({ "type": "country" })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json_body(created).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["label"], format!("country {id}"));

    let registered = send(
        &app,
        "POST",
        &format!("/api/addresses/{id}/names"),
        Some(&cookie),
        Some(json!({ "name": "Spain" })),
    )
    .await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let registered = json_body(registered).await;
    assert_eq!(registered["full_names"][0]["full_name"], "country Spain");

    let shown = send(&app, "GET", &format!("/api/addresses/{id}"), Some(&cookie), None).await;
    assert_eq!(json_body(shown).await["label"], "country Spain");

    let blank = send(
        &app,
        "POST",
        &format!("/api/addresses/{id}/names"),
        Some(&cookie),
        Some(json!({ "name": "   " })),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let missing = send(&app, "GET", "/api/addresses/2147483647", Some(&cookie), None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool);
    let email = format!("{}@example.org", unique("http"));
    AuthService::new(&pool)
        .create_user(&email, PASSWORD)
        .await
        .unwrap();

    let response = login(&app, &email, "not the password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivation_ends_access() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool);
    let email = format!("{}@example.org", unique("http"));
    let user = AuthService::new(&pool)
        .create_user(&email, PASSWORD)
        .await
        .unwrap();

    let cookie = session_cookie(&login(&app, &email, PASSWORD).await);
    let ok = send(&app, "GET", "/api/roles", Some(&cookie), None).await;
    assert_eq!(ok.status(), StatusCode::OK);

    UserRepository::new(&pool)
        .set_active(user.id, false)
        .await
        .unwrap();
    let denied = send(&app, "GET", "/api/roles", Some(&cookie), None).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool);
    let email = format!("{}@example.org", unique("http"));
    AuthService::new(&pool)
        .create_user(&email, PASSWORD)
        .await
        .unwrap();

    let cookie = session_cookie(&login(&app, &email, PASSWORD).await);
    let out = send(&app, "POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(out.status(), StatusCode::NO_CONTENT);

    let me = send(&app, "GET", "/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}
