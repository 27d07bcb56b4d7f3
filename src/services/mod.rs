//! Application services.
//!
//! Each service borrows the repository (and configuration where needed) for
//! the duration of one request and carries the business rules: uniqueness
//! pre-checks, lifecycle gating, visibility and the comment gate. Handlers
//! only translate HTTP to service calls.

mod accounts;
mod comments;
mod posts;

pub use accounts::AccountService;
pub use comments::CommentService;
pub use posts::PostService;

use uuid::Uuid;

use crate::{error::AppError, models::Post, repository::Repository};

/// Loads a post or fails with `NotFound`.
pub(crate) async fn load_post(repo: &dyn Repository, id: Uuid) -> Result<Post, AppError> {
    repo.find_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post not found with id: {}", id)))
}
