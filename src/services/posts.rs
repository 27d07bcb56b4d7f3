use uuid::Uuid;

use super::load_post;
use crate::{
    auth::AuthUser,
    error::AppError,
    lifecycle::{self, LifecycleError, PostAction},
    models::{AssignUpdateRequest, CreatePostRequest, NewPost, PostStatus, PostView},
    repository::{PostFilter, Repository},
};

/// Service for post creation, the approval workflow and post listings.
pub struct PostService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> PostService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Create a draft owned by `actor`.
    pub async fn create(&self, actor: &AuthUser, request: CreatePostRequest) -> Result<PostView, AppError> {
        let post = self
            .repo
            .create_post(NewPost {
                title: request.title,
                description: request.description,
                post_type: request.post_type,
                created_by: actor.id,
            })
            .await?;

        tracing::info!(post_id = %post.id, user_id = %actor.id, "Post created");
        Ok(post.into())
    }

    pub async fn submit(&self, actor: &AuthUser, id: Uuid) -> Result<PostView, AppError> {
        self.apply(actor, id, PostAction::Submit).await
    }

    pub async fn approve(&self, actor: &AuthUser, id: Uuid) -> Result<PostView, AppError> {
        self.apply(actor, id, PostAction::Approve).await
    }

    pub async fn reject(&self, actor: &AuthUser, id: Uuid) -> Result<PostView, AppError> {
        self.apply(actor, id, PostAction::Reject).await
    }

    pub async fn close(&self, actor: &AuthUser, id: Uuid) -> Result<PostView, AppError> {
        self.apply(actor, id, PostAction::Close).await
    }

    /// Run one lifecycle action.
    ///
    /// The status write is conditional on the status that was checked, so
    /// two concurrent callers cannot both move the post.
    pub async fn apply(&self, actor: &AuthUser, id: Uuid, action: PostAction) -> Result<PostView, AppError> {
        let post = load_post(self.repo, id).await?;
        let from = post.status;
        let to = lifecycle::plan(action, actor.actor_for(&post), from)?;

        match self.repo.transition_post(id, from, to).await? {
            Some(updated) => {
                tracing::info!(
                    post_id = %id,
                    user_id = %actor.id,
                    %action,
                    from = %from,
                    to = %to,
                    "Post status changed"
                );
                Ok(updated.into())
            }
            None => {
                // Lost a race: report against whatever the post holds now.
                let current = load_post(self.repo, id).await?;
                tracing::warn!(post_id = %id, %action, status = %current.status, "Concurrent transition lost");
                Err(LifecycleError::IllegalTransition {
                    action,
                    expected: from,
                    actual: current.status,
                }
                .into())
            }
        }
    }

    /// Attach or replace the administrator's update note. Any status.
    pub async fn assign_update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: AssignUpdateRequest,
    ) -> Result<PostView, AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only administrators can assign updates to posts".into(),
            ));
        }

        let post = self
            .repo
            .set_assigned_update(id, request.note)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found with id: {}", id)))?;

        tracing::info!(post_id = %id, user_id = %actor.id, "Update note assigned");
        Ok(post.into())
    }

    /// A single post, if `actor` may see it at its current status.
    pub async fn get(&self, actor: &AuthUser, id: Uuid) -> Result<PostView, AppError> {
        let post = load_post(self.repo, id).await?;
        if !lifecycle::can_view(actor.actor_for(&post), post.status) {
            return Err(AppError::Forbidden(
                "You don't have permission to view this post".into(),
            ));
        }
        Ok(post.into())
    }

    /// Every post at every status. Administrators only.
    pub async fn list_all(&self, actor: &AuthUser) -> Result<Vec<PostView>, AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("Only administrators can view all posts".into()));
        }
        self.list(PostFilter::All).await
    }

    pub async fn list_approved(&self) -> Result<Vec<PostView>, AppError> {
        self.list(PostFilter::Status(PostStatus::Approved)).await
    }

    /// The caller's own posts regardless of status.
    pub async fn list_mine(&self, actor: &AuthUser) -> Result<Vec<PostView>, AppError> {
        self.list(PostFilter::CreatedBy(actor.id)).await
    }

    async fn list(&self, filter: PostFilter) -> Result<Vec<PostView>, AppError> {
        let posts = self.repo.list_posts(filter).await?;
        Ok(posts.into_iter().map(PostView::from).collect())
    }
}
