//! Rate limiting middleware
//!
//! Sliding one-minute window per actor. The limit is read from the runtime
//! configuration on every request so it can change without a restart.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::auth::Actor;
use crate::error::{ApiError, AuthError};
use crate::server::state::AppState;

/// Window the per-actor limit applies to
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Simple rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    requests: HashMap<String, Vec<Instant>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            requests: HashMap::new(),
            window,
        }
    }

    pub fn is_allowed(&mut self, client_id: &str, max_requests: usize) -> bool {
        self.is_allowed_at(client_id, max_requests, Instant::now())
    }

    pub fn is_allowed_at(&mut self, client_id: &str, max_requests: usize, now: Instant) -> bool {
        let window = self.window;

        // Forget clients whose whole history fell out of the window
        self.requests.retain(|_, times| {
            times.retain(|&time| now.saturating_duration_since(time) < window);
            !times.is_empty()
        });

        let entry = self.requests.entry(client_id.to_string()).or_default();

        // Check if under limit
        if entry.len() < max_requests {
            entry.push(now);
            true
        } else {
            false
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_WINDOW)
    }
}

/// Rejects the request with 429 once the actor used up its window.
///
/// Runs after authentication; requests without an actor pass through.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(actor_id) = request.extensions().get::<Actor>().map(|a| a.id.clone()) else {
        return next.run(request).await;
    };

    let limit = state.runtime.read().await.rate_limit;
    let allowed = state
        .rate_limiter
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .is_allowed(&actor_id, limit);

    if !allowed {
        debug!("Actor {} exceeded {} requests per minute", actor_id, limit);
        return ApiError::Auth(AuthError::RateLimited(actor_id)).into_response();
    }

    next.run(request).await
}
