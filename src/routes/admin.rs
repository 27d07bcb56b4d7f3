use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Moderation endpoints. A non-admin caller passes authentication but is
/// refused with 403 by the post service.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/posts
        // Every post regardless of status.
        .route("/api/posts", get(handlers::get_all_posts))
        // PUT /api/posts/{id}/approve
        .route("/api/posts/{id}/approve", put(handlers::approve_post))
        // PUT /api/posts/{id}/reject
        .route("/api/posts/{id}/reject", put(handlers::reject_post))
        // PUT /api/posts/{id}/close
        .route("/api/posts/{id}/close", put(handlers::close_post))
        // PUT /api/posts/{id}/assign-update
        // Attaches an administrator's note at any status.
        .route("/api/posts/{id}/assign-update", put(handlers::assign_update))
}
