//! HTTP surface of the undo service.
//!
//! ```text
//! GET  /health                          liveness, database and restorers
//! GET  /api/v1/ai/undo/{message_id}     preview           (bearer token)
//! POST /api/v1/ai/undo/{message_id}     execute {"mode"}  (bearer token)
//! ```
//!
//! The binary and the integration tests both build the app through
//! [`build_app_router`].

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::handlers::{ai_undo, health};
use crate::state::AppState;

const REQUEST_ID: &str = "x-request-id";

pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID);

    let undo = Router::new().route(
        "/ai/undo/{message_id}",
        get(ai_undo::preview_undo).post(ai_undo::execute_undo),
    );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", undo)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

/// CORS for the PageSpace web client: bearer-token GET/POST only, no cookies.
///
/// Origins that are not valid header values are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID)])
        .max_age(Duration::from_secs(3600))
}
