use std::sync::Arc;
use std::time::Duration;

use auth::Role;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::me::me;
use super::handlers::password_recovery::password_recovery;
use super::handlers::password_reset::password_reset;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::require_role;
use super::middleware::RoleRequirement;
use crate::identity::gate::RoleGate;
use crate::identity::service::IdentityService;
use crate::outbound::email::log::LogMailer;
use crate::outbound::repositories::principal::PostgresPrincipalRepository;
use crate::outbound::stores::memory::InMemoryEphemeralStore;

pub type Service =
    IdentityService<PostgresPrincipalRepository, InMemoryEphemeralStore, LogMailer>;
pub type Gate = RoleGate<PostgresPrincipalRepository, InMemoryEphemeralStore>;

const ANY_ROLE: &[Role] = &[Role::Customer, Role::Mechanic, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Clone)]
pub struct AppState {
    pub identity_service: Arc<Service>,
    pub role_gate: Arc<Gate>,
}

pub fn create_router(identity_service: Arc<Service>, role_gate: Arc<Gate>) -> Router {
    let state = AppState {
        identity_service,
        role_gate,
    };

    let public_routes = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh-token", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/password-recovery", post(password_recovery))
        .route("/api/auth/password-reset", post(password_reset));

    let protected_routes = Router::new()
        .route("/api/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            RoleRequirement {
                state: state.clone(),
                allowed: ANY_ROLE,
            },
            require_role,
        ));

    let admin_routes = Router::new()
        .route("/api/auth/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            RoleRequirement {
                state: state.clone(),
                allowed: ADMIN_ONLY,
            },
            require_role,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
