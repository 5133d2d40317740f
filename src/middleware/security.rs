//! Security middleware
//!
//! Bearer token authentication for every API route.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::server::state::AppState;

/// Resolves the bearer token to an [`Actor`](crate::auth::Actor) and stores
/// it in the request extensions. The actor is also attached to the response
/// so outer layers can log it.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let actor = match authenticate(header, &state.credentials) {
        Ok(actor) => actor,
        Err(e) => return ApiError::Auth(e).into_response(),
    };

    request.extensions_mut().insert(actor.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(actor);
    response
}
