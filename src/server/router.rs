//! Route table and middleware stack

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use log::warn;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use super::state::AppState;
use crate::middleware::{log_requests, rate_limit, require_bearer};
use crate::protocol::handlers;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Builds the API router mounted under `namespace`.
///
/// Layers run outermost first: CORS, request logging, authentication, rate
/// limiting, body limit.
pub fn build_router(state: AppState, namespace: &str, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/templates", get(handlers::list_templates))
        .route("/templates/read", post(handlers::read_template))
        .route("/templates/update", post(handlers::update_template))
        .route("/system/info", get(handlers::system_info))
        .route(
            "/woocommerce/bulk-update",
            post(handlers::catalog_bulk_update),
        )
        .route("/backups", get(handlers::list_backups))
        .route("/backups/stats", get(handlers::backup_stats))
        .route("/backups/restore", post(handlers::restore_backup))
        .route("/backups/cleanup", post(handlers::cleanup_backups))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn_with_state(state.clone(), require_bearer))
        .layer(from_fn(log_requests))
        .with_state(state);

    let namespace = normalize_namespace(namespace);
    let router = if namespace.is_empty() {
        api
    } else {
        Router::new().nest(&namespace, api)
    };

    match cors_layer(cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// `mcp/v1/` becomes `/mcp/v1`; `/` becomes empty
fn normalize_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Allow-list CORS; `None` when no origin is configured
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) if origin.trim() != "*" => Some(value),
            _ => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
    )
}
