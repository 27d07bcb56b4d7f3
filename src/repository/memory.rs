use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PostFilter, RepoResult, Repository, RepositoryError};
use crate::models::{Comment, NewPost, NewUser, Post, PostStatus, User};

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory. Used by the handler and API
/// tests so they exercise the real services without a Postgres instance.
/// Mirrors the Postgres semantics that matter to callers: unique usernames and
/// emails, compare-and-set transitions, newest-first ordering.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Store>,
}

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    next_comment_id: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; insertion order breaks timestamp ties.
fn newest_first<T>(items: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    items.rev().collect()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.inner.read().await;
        Ok(store.users.values().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        let store = self.inner.read().await;
        Ok(store.users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let store = self.inner.read().await;
        Ok(store.users.values().any(|u| u.email == email))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.inner.write().await;

        if store.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Duplicate { field: "username" });
        }
        if store.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate { field: "email" });
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let mut store = self.inner.write().await;

        // Mirrors the foreign key on posts.created_by.
        let author = store
            .users
            .get(&post.created_by)
            .map(|u| u.username.clone())
            .ok_or_else(|| RepositoryError::Database(sqlx::Error::RowNotFound))?;

        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            description: post.description,
            post_type: post.post_type,
            status: PostStatus::Draft,
            created_by: post.created_by,
            created_by_username: author,
            assigned_update: None,
            created_at: now,
            updated_at: now,
        };
        store.posts.push(created.clone());
        Ok(created)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let store = self.inner.read().await;
        Ok(store.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>> {
        let store = self.inner.read().await;
        Ok(newest_first(
            store.posts.iter().filter(|p| filter.matches(p)).cloned(),
        ))
    }

    async fn transition_post(&self, id: Uuid, from: PostStatus, to: PostStatus) -> RepoResult<Option<Post>> {
        let mut store = self.inner.write().await;
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id && p.status == from) else {
            return Ok(None);
        };
        post.status = to;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn set_assigned_update(&self, id: Uuid, note: String) -> RepoResult<Option<Post>> {
        let mut store = self.inner.write().await;
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.assigned_update = Some(note);
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn add_comment(&self, post_id: Uuid, user_id: Uuid, text: String) -> RepoResult<Comment> {
        let mut store = self.inner.write().await;

        // Mirrors the foreign keys on comments.post_id and comments.created_by.
        let post_exists = store.posts.iter().any(|p| p.id == post_id);
        let author = store.users.get(&user_id).map(|u| u.username.clone());
        let author = match (post_exists, author) {
            (true, Some(author)) => author,
            _ => return Err(RepositoryError::Database(sqlx::Error::RowNotFound)),
        };

        store.next_comment_id += 1;
        let comment = Comment {
            id: store.next_comment_id,
            text,
            post_id,
            created_by: user_id,
            created_by_username: author,
            created_at: Utc::now(),
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let store = self.inner.read().await;
        Ok(newest_first(
            store.comments.iter().filter(|c| c.post_id == post_id).cloned(),
        ))
    }
}
