use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

// --- Enumerations (stored as TEXT columns) ---

/// UnknownVariant
///
/// Raised when a TEXT column holds a value that does not map onto one of the
/// enumerations below. Surfaces as a database decode error.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements the string mapping shared by every TEXT-backed enum:
/// `as_str`, `Display`, `FromStr` and `TryFrom<String>` (used by `#[sqlx(try_from)]`).
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

/// RoleName
///
/// The two roles a user can hold. Every user holds `User`; administrators
/// additionally hold `Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum RoleName {
    Admin,
    User,
}

text_enum!(RoleName, "role", { Admin => "ADMIN", User => "USER" });

/// PostType
///
/// The category a post is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PostType {
    Issue,
    Complaint,
    Announcement,
    Lost,
    Found,
    Help,
    Event,
    Other,
}

text_enum!(PostType, "post type", {
    Issue => "ISSUE",
    Complaint => "COMPLAINT",
    Announcement => "ANNOUNCEMENT",
    Lost => "LOST",
    Found => "FOUND",
    Help => "HELP",
    Event => "EVENT",
    Other => "OTHER",
});

/// PostStatus
///
/// Position of a post in the approval workflow. Legal moves between these
/// states are defined in `crate::lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PostStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Closed,
}

text_enum!(PostStatus, "post status", {
    Draft => "DRAFT",
    PendingApproval => "PENDING_APPROVAL",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Closed => "CLOSED",
});

// --- Core Records (Mapped to Database) ---

/// User
///
/// A registered account as stored in the `users` table. The role set is
/// loaded from `user_roles` by the repository, and the password hash never
/// leaves the service layer.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(skip)]
    pub roles: BTreeSet<RoleName>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&RoleName::Admin)
    }
}

/// Post
///
/// A bulletin-board post joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type", try_from = "String")]
    pub post_type: PostType,
    #[sqlx(try_from = "String")]
    pub status: PostStatus,
    pub created_by: Uuid,
    pub created_by_username: String,
    pub assigned_update: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment row from the `comments` table, augmented with the author's
/// username (a join in the repository query).
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: Uuid,
    pub created_by: Uuid,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for `Repository::create_user`. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<RoleName>,
}

/// NewPost
///
/// Insert payload for `Repository::create_post`. Posts always start in `Draft`.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: Option<String>,
    pub post_type: PostType,
    pub created_by: Uuid,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /auth/register).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(length(min = 6, max = 100, message = "Password must be between 6 and 100 characters"))]
    pub password: String,
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
}

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank", message = "Username is required"))]
    pub username: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    pub password: String,
}

/// CreatePostRequest
///
/// Input payload for POST /api/posts. The new post is always a draft owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreatePostRequest {
    #[validate(
        custom(function = "not_blank", message = "Title is required"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: PostType,
}

/// AssignUpdateRequest
///
/// Input payload for PUT /api/posts/{id}/assign-update (admin note).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct AssignUpdateRequest {
    #[validate(
        custom(function = "not_blank", message = "Update note is required"),
        length(max = 2000, message = "Update note must be at most 2000 characters")
    )]
    pub note: String,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[validate(
        custom(function = "not_blank", message = "Comment text is required"),
        length(max = 2000, message = "Comment must be at most 2000 characters")
    )]
    pub text: String,
}

// --- Response Views (Output Schemas) ---

/// UserView
///
/// Public view of an account, returned by registration, login and /auth/me.
/// Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<RoleName>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.iter().copied().collect(),
        }
    }
}

/// LoginResponse
///
/// The user view plus the bearer token to send on subsequent requests.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserView,
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// PostView
///
/// Response shape for every post endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub status: PostStatus,
    pub created_by_username: String,
    pub assigned_update: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            description: post.description,
            post_type: post.post_type,
            status: post.status,
            created_by_username: post.created_by_username,
            assigned_update: post.assigned_update,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// CommentView
///
/// Response shape for comment endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub post_id: Uuid,
    pub created_by_username: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            post_id: comment.post_id,
            created_by_username: comment.created_by_username,
            created_at: comment.created_at,
        }
    }
}
