use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Endpoints for any signed-in user. Ownership and visibility rules
/// (owner-only submit, approved-or-own reads, the comment gate) are enforced
/// in the services using the `AuthUser` resolved by the auth layer.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::get_me))
        // POST /api/posts
        // New posts always start as DRAFT.
        .route("/api/posts", post(handlers::create_post))
        // GET /api/posts/approved
        .route("/api/posts/approved", get(handlers::get_approved_posts))
        // GET /api/posts/user/posts
        // The caller's posts at every status.
        .route("/api/posts/user/posts", get(handlers::get_my_posts))
        // GET /api/posts/{id}
        .route("/api/posts/{id}", get(handlers::get_post))
        // PUT /api/posts/{id}/submit
        // Owner only; DRAFT → PENDING_APPROVAL.
        .route("/api/posts/{id}/submit", put(handlers::submit_post))
        // POST/GET /api/posts/{id}/comments
        .route(
            "/api/posts/{id}/comments",
            post(handlers::add_comment).get(handlers::get_comments),
        )
}
