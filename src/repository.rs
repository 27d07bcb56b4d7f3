use crate::models::{Comment, NewPost, NewUser, Post, PostStatus, RoleName, User};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::{collections::BTreeSet, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

mod memory;

pub use memory::InMemoryRepository;

/// RepositoryError
///
/// Failures the persistence layer reports to the services. Uniqueness
/// violations are classified so they can surface as conflicts instead of
/// internal errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique column (`username` or `email`) already holds this value.
    #[error("{field} already exists")]
    Duplicate { field: &'static str },

    /// The seeded role row is missing from the `roles` table.
    #[error("role {0} is not seeded")]
    MissingRole(RoleName),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// PostFilter
///
/// Selects which posts a listing returns. Listings are always newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Status(PostStatus),
    CreatedBy(Uuid),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Status(status) => post.status == *status,
            PostFilter::CreatedBy(user_id) => post.created_by == *user_id,
        }
    }
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so services
/// and handlers never know whether they talk to Postgres or the in-memory store.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn username_exists(&self, username: &str) -> RepoResult<bool>;
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;
    /// Inserts the user and links every requested role in one transaction.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    // --- Posts ---
    async fn create_post(&self, post: NewPost) -> RepoResult<Post>;
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>>;
    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>>;
    /// Compare-and-set on the status column: moves the post from `from` to `to`
    /// and returns it, or returns `None` when the post is missing or no longer in `from`.
    async fn transition_post(&self, id: Uuid, from: PostStatus, to: PostStatus) -> RepoResult<Option<Post>>;
    async fn set_assigned_update(&self, id: Uuid, note: String) -> RepoResult<Option<Post>>;

    // --- Comments ---
    async fn add_comment(&self, post_id: Uuid, user_id: Uuid, text: String) -> RepoResult<Comment>;
    /// Comments for a post, newest first.
    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Projection shared by every post query; `p` is the post row, `u` its author.
const POST_COLUMNS: &str = "p.id, p.title, p.description, p.type, p.status, p.created_by, \
     u.username AS created_by_username, p.assigned_update, p.created_at, p.updated_at";

/// Maps unique-constraint violations on `users` onto `RepositoryError::Duplicate`.
fn classify_insert_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_email_key") => "email",
                _ => "username",
            };
            return RepositoryError::Duplicate { field };
        }
    }
    RepositoryError::Database(err)
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_roles(&self, user_id: Uuid) -> RepoResult<BTreeSet<RoleName>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        names
            .into_iter()
            .map(|name| {
                name.parse::<RoleName>()
                    .map_err(|e| RepositoryError::Database(sqlx::Error::Decode(Box::new(e))))
            })
            .collect()
    }

    async fn with_roles(&self, user: Option<User>) -> RepoResult<Option<User>> {
        match user {
            Some(mut user) => {
                user.roles = self.load_roles(user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roles(user).await
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roles(user).await
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// create_user
    ///
    /// Inserts the account and its role links inside one transaction. Dropping
    /// the transaction on any early return rolls the insert back.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;

        let mut created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, email, password_hash)
               VALUES ($1, $2, $3, $4)
               RETURNING id, username, email, password_hash"#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify_insert_error)?;

        for role in &user.roles {
            let linked = sqlx::query(
                "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
            )
            .bind(created.id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

            if linked.rows_affected() == 0 {
                return Err(RepositoryError::MissingRole(*role));
            }
        }

        tx.commit().await?;

        created.roles = user.roles;
        Ok(created)
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let query = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (id, title, description, type, status, created_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p JOIN users u ON u.id = p.created_by
            "#
        );

        let created = sqlx::query_as::<_, Post>(&query)
            .bind(Uuid::new_v4())
            .bind(&post.title)
            .bind(&post.description)
            .bind(post.post_type.as_str())
            .bind(PostStatus::Draft.as_str())
            .bind(post.created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.created_by WHERE p.id = $1"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// list_posts
    ///
    /// Uses QueryBuilder so the optional filter stays parameterized.
    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.created_by"
        ));

        match filter {
            PostFilter::All => {}
            PostFilter::Status(status) => {
                builder.push(" WHERE p.status = ");
                builder.push_bind(status.as_str());
            }
            PostFilter::CreatedBy(user_id) => {
                builder.push(" WHERE p.created_by = ");
                builder.push_bind(user_id);
            }
        }

        builder.push(" ORDER BY p.created_at DESC, p.id DESC");

        let posts = builder.build_query_as::<Post>().fetch_all(&self.pool).await?;
        Ok(posts)
    }

    async fn transition_post(&self, id: Uuid, from: PostStatus, to: PostStatus) -> RepoResult<Option<Post>> {
        let query = format!(
            r#"
            WITH p AS (
                UPDATE posts SET status = $3, updated_at = NOW()
                WHERE id = $1 AND status = $2
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p JOIN users u ON u.id = p.created_by
            "#
        );

        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn set_assigned_update(&self, id: Uuid, note: String) -> RepoResult<Option<Post>> {
        let query = format!(
            r#"
            WITH p AS (
                UPDATE posts SET assigned_update = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p JOIN users u ON u.id = p.created_by
            "#
        );

        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(note)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// add_comment
    ///
    /// Uses a CTE to insert and join the author's username in one round trip.
    async fn add_comment(&self, post_id: Uuid, user_id: Uuid, text: String) -> RepoResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (text, post_id, created_by) VALUES ($1, $2, $3)
                RETURNING id, text, post_id, created_by, created_at
            )
            SELECT i.id, i.text, i.post_id, i.created_by, u.username AS created_by_username, i.created_at
            FROM inserted i JOIN users u ON u.id = i.created_by
            "#,
        )
        .bind(text)
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.post_id, c.created_by, u.username AS created_by_username, c.created_at
            FROM comments c JOIN users u ON u.id = c.created_by
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
