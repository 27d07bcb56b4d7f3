use uuid::Uuid;

use super::load_post;
use crate::{
    auth::AuthUser,
    error::AppError,
    lifecycle,
    models::{CommentView, CreateCommentRequest},
    repository::Repository,
};

/// Service for comments. Reading and writing share one gate: the caller
/// must be an administrator, the author of the post, or the post must be
/// approved.
pub struct CommentService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> CommentService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    pub async fn add(
        &self,
        actor: &AuthUser,
        post_id: Uuid,
        request: CreateCommentRequest,
    ) -> Result<CommentView, AppError> {
        let post = load_post(self.repo, post_id).await?;
        if !lifecycle::can_view(actor.actor_for(&post), post.status) {
            return Err(AppError::Forbidden(
                "You can only comment on your own posts or approved posts".into(),
            ));
        }

        let comment = self.repo.add_comment(post_id, actor.id, request.text).await?;
        tracing::info!(post_id = %post_id, comment_id = comment.id, user_id = %actor.id, "Comment added");
        Ok(comment.into())
    }

    /// Comments on a post, newest first.
    pub async fn list(&self, actor: &AuthUser, post_id: Uuid) -> Result<Vec<CommentView>, AppError> {
        let post = load_post(self.repo, post_id).await?;
        if !lifecycle::can_view(actor.actor_for(&post), post.status) {
            return Err(AppError::Forbidden(
                "You don't have permission to view comments on this post".into(),
            ));
        }

        let comments = self.repo.list_comments(post_id).await?;
        Ok(comments.into_iter().map(CommentView::from).collect())
    }
}
