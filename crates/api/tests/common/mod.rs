#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pagespace_api::config::ServerConfig;
use pagespace_api::middleware::auth::sign_access_token;
use pagespace_api::router::build_app_router;
use pagespace_api::state::AppState;
use pagespace_core::ai_undo::UndoConfig;
use pagespace_core::types::DbId;
use pagespace_events::EventBus;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        undo: UndoConfig::new(2),
    }
}

/// Build the full application router over `pool` with a private event bus.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_bus(pool, Arc::new(EventBus::default()))
}

/// Build the full application router, publishing events to `bus`.
pub fn build_test_app_with_bus(pool: PgPool, bus: Arc<EventBus>) -> Router {
    let config = test_config();
    let state = AppState::new(pool, config.clone(), bus);
    build_app_router(state, &config)
}

/// A valid bearer token for `user_id`.
pub fn token_for(user_id: DbId) -> String {
    sign_access_token(user_id, TEST_JWT_SECRET, chrono::Duration::minutes(15)).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

/// Unauthenticated GET.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// GET with a bearer token.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a JSON body with a bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a raw body labelled as JSON with a bearer token.
pub async fn post_raw_auth(app: Router, uri: &str, token: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
