use auth::Role;
use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Per-route state for the role-gate middleware: the shared gate plus the
/// role set this route requires.
#[derive(Clone)]
pub struct RoleRequirement {
    pub state: AppState,
    pub allowed: &'static [Role],
}

/// Middleware authorizing the bearer token against the route's role set.
///
/// On success the resolved principal snapshot is inserted into request
/// extensions for handlers to pick up.
pub async fn require_role(
    State(requirement): State<RoleRequirement>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer_token(&req)?;

    let principal = requirement
        .state
        .role_gate
        .authorize(token, requirement.allowed)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Authorization failed");
            ApiError::from(e).into_response()
        })?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_bearer_token(req: &Request) -> Result<&str, Response> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::Unauthorized("Missing Authorization header".to_string()).into_response()
        })?;

    let auth_str = auth_header.to_str().map_err(|_| {
        ApiError::Unauthorized("Invalid Authorization header".to_string()).into_response()
    })?;

    if !auth_str.starts_with("Bearer ") {
        return Err(ApiError::Unauthorized(
            "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
        )
        .into_response());
    }

    Ok(auth_str.trim_start_matches("Bearer "))
}
