//! Logging middleware
//!
//! Provides request logging functionality.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::{info, warn};
use std::time::Instant;

use crate::auth::Actor;

/// Logs method, path, actor, status and latency of every request
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let actor = response
        .extensions()
        .get::<Actor>()
        .map(|a| a.id.as_str())
        .unwrap_or("-");
    let status = response.status();
    let elapsed = started.elapsed().as_millis();

    if status.is_server_error() {
        warn!("{} {} actor={} status={} {}ms", method, path, actor, status.as_u16(), elapsed);
    } else {
        info!("{} {} actor={} status={} {}ms", method, path, actor, status.as_u16(), elapsed);
    }
    response
}
