use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and container health checks.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Creates an account holding the USER role.
        .route("/auth/register", post(handlers::register_user))
        // POST /auth/login
        // Verifies credentials and returns a bearer token.
        .route("/auth/login", post(handlers::login))
}
