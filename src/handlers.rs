use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{
        AssignUpdateRequest, CommentView, CreateCommentRequest, CreatePostRequest, LoginRequest,
        LoginResponse, PostView, RegisterRequest, UserView,
    },
    services::{AccountService, CommentService, PostService},
    validation::{ValidatedJson, ValidatedPath},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use uuid::Uuid;

// --- Accounts ---

/// register_user
///
/// [Public Route] Creates an account holding the USER role.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserView),
        (status = 409, description = "Username or email already exists"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = AccountService::new(state.repo.as_ref(), &state.config)
        .register(payload)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges a username and password for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AccountService::new(state.repo.as_ref(), &state.config)
        .login(payload)
        .await?;
    Ok(Json(response))
}

/// get_me
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Current user", body = UserView))
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserView>, AppError> {
    let view = AccountService::new(state.repo.as_ref(), &state.config)
        .me(&user)
        .await?;
    Ok(Json(view))
}

// --- Posts ---

/// create_post
///
/// [Authenticated Route] Creates a draft owned by the caller.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses((status = 201, description = "Created", body = PostView))
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), AppError> {
    let post = PostService::new(state.repo.as_ref())
        .create(&user, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// submit_post
///
/// [Authenticated Route] DRAFT → PENDING_APPROVAL. Owner only.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/submit",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Submitted", body = PostView),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Post is not a draft")
    )
)]
pub async fn submit_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(state.repo.as_ref()).submit(&user, id).await?;
    Ok(Json(post))
}

/// approve_post
///
/// [Admin Route] PENDING_APPROVAL → APPROVED.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/approve",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Approved", body = PostView),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Post is not pending approval")
    )
)]
pub async fn approve_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(state.repo.as_ref()).approve(&user, id).await?;
    Ok(Json(post))
}

/// reject_post
///
/// [Admin Route] PENDING_APPROVAL → REJECTED.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/reject",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Rejected", body = PostView),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Post is not pending approval")
    )
)]
pub async fn reject_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(state.repo.as_ref()).reject(&user, id).await?;
    Ok(Json(post))
}

/// close_post
///
/// [Admin Route] APPROVED → CLOSED.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/close",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Closed", body = PostView),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Post is not approved")
    )
)]
pub async fn close_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(state.repo.as_ref()).close(&user, id).await?;
    Ok(Json(post))
}

/// assign_update
///
/// [Admin Route] Sets the administrator's update note on a post at any status.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/assign-update",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = AssignUpdateRequest,
    responses(
        (status = 200, description = "Note assigned", body = PostView),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn assign_update(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignUpdateRequest>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(state.repo.as_ref())
        .assign_update(&user, id, payload)
        .await?;
    Ok(Json(post))
}

/// get_post
///
/// [Authenticated Route] A single post. Visible to its owner and administrators
/// at any status, to everyone else once approved.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostView),
        (status = 403, description = "Not visible to the caller"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = PostService::new(state.repo.as_ref()).get(&user, id).await?;
    Ok(Json(post))
}

/// get_all_posts
///
/// [Admin Route] Every post at every status, newest first.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses(
        (status = 200, description = "All posts", body = [PostView]),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn get_all_posts(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = PostService::new(state.repo.as_ref()).list_all(&user).await?;
    Ok(Json(posts))
}

/// get_approved_posts
///
/// [Authenticated Route] Approved posts only, newest first.
#[utoipa::path(
    get,
    path = "/api/posts/approved",
    responses((status = 200, description = "Approved posts", body = [PostView]))
)]
pub async fn get_approved_posts(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = PostService::new(state.repo.as_ref()).list_approved().await?;
    Ok(Json(posts))
}

/// get_my_posts
///
/// [Authenticated Route] The caller's posts regardless of status, newest first.
#[utoipa::path(
    get,
    path = "/api/posts/user/posts",
    responses((status = 200, description = "My posts", body = [PostView]))
)]
pub async fn get_my_posts(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = PostService::new(state.repo.as_ref()).list_mine(&user).await?;
    Ok(Json(posts))
}

// --- Comments ---

/// add_comment
///
/// [Authenticated Route] Comments on a post the caller may see.
#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = CommentView),
        (status = 403, description = "Post not open to the caller for comments")
    )
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(post_id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let comment = CommentService::new(state.repo.as_ref())
        .add(&user, post_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_comments
///
/// [Authenticated Route] Comments on a post, newest first.
#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentView]),
        (status = 403, description = "Post not visible to the caller")
    )
)]
pub async fn get_comments(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(post_id): ValidatedPath<Uuid>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let comments = CommentService::new(state.repo.as_ref())
        .list(&user, post_id)
        .await?;
    Ok(Json(comments))
}
