use axum::{
    Json,
    body::Body,
    extract::{FromRequest, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use bulletin_board::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::AppError,
    handlers,
    models::{
        CreateCommentRequest, CreatePostRequest, PostStatus, PostType, RegisterRequest, RoleName,
    },
    repository::InMemoryRepository,
    validation::{ValidatedJson, ValidatedPath},
};
use serde_json::Value;
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- Helpers ---

fn create_test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config: AppConfig::default(),
    }
}

/// Registers `username` through the handler and returns the resolved identity.
async fn register(state: &AppState, username: &str) -> AuthUser {
    let payload = RegisterRequest {
        username: username.to_string(),
        password: "secret1".to_string(),
        email: format!("{}@example.com", username),
    };
    let (status, _) = handlers::register_user(State(state.clone()), ValidatedJson(payload))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    state
        .repo
        .find_user_by_username(username)
        .await
        .unwrap()
        .map(AuthUser::from)
        .unwrap()
}

fn admin_user() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        username: "admin".to_string(),
        roles: [RoleName::Admin, RoleName::User].into_iter().collect(),
    }
}

async fn into_parts(response: Response) -> (StatusCode, Value) {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (parts.status, json)
}

async fn create_draft(state: &AppState, author: &AuthUser) -> Uuid {
    let payload = CreatePostRequest {
        title: "Street party".to_string(),
        description: None,
        post_type: PostType::Event,
    };
    let (_, Json(post)) = handlers::create_post(author.clone(), State(state.clone()), ValidatedJson(payload))
        .await
        .unwrap();
    post.id
}

// --- Account Handlers ---

#[test]
async fn test_register_returns_created_user_view() {
    let state = create_test_state();
    let payload = RegisterRequest {
        username: "alice".to_string(),
        password: "secret1".to_string(),
        email: "alice@example.com".to_string(),
    };

    let response = handlers::register_user(State(state), ValidatedJson(payload))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["roles"], serde_json::json!(["USER"]));
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[test]
async fn test_duplicate_registration_maps_to_409_body() {
    let state = create_test_state();
    register(&state, "alice").await;

    let payload = RegisterRequest {
        username: "alice".to_string(),
        password: "secret1".to_string(),
        email: "other@example.com".to_string(),
    };
    let response = handlers::register_user(State(state), ValidatedJson(payload))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "Username already exists");
}

#[test]
async fn test_get_me_returns_caller() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;

    let Json(me) = handlers::get_me(alice.clone(), State(state)).await.unwrap();
    assert_eq!(me.id, alice.id);
    assert_eq!(me.email, "alice@example.com");
}

// --- Post Handlers ---

#[test]
async fn test_create_post_returns_201_draft() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;

    let payload = CreatePostRequest {
        title: "Lost dog".to_string(),
        description: Some("Brown, answers to Rex".to_string()),
        post_type: PostType::Lost,
    };
    let response = handlers::create_post(alice, State(state), ValidatedJson(payload))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "DRAFT");
    assert_eq!(body["type"], "LOST");
    assert_eq!(body["createdByUsername"], "alice");
}

#[test]
async fn test_submit_then_approve_flow() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;
    let id = create_draft(&state, &alice).await;

    let Json(post) = handlers::submit_post(alice, State(state.clone()), ValidatedPath(id))
        .await
        .unwrap();
    assert_eq!(post.status, PostStatus::PendingApproval);

    let Json(post) = handlers::approve_post(admin_user(), State(state), ValidatedPath(id))
        .await
        .unwrap();
    assert_eq!(post.status, PostStatus::Approved);
}

#[test]
async fn test_approve_by_regular_user_is_403() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;
    let id = create_draft(&state, &alice).await;

    let response = handlers::approve_post(alice, State(state), ValidatedPath(id))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[test]
async fn test_illegal_transition_is_409_invalid_operation() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;
    let id = create_draft(&state, &alice).await;

    let response = handlers::close_post(admin_user(), State(state), ValidatedPath(id))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");
    assert_eq!(
        body["error"]["message"],
        "Only posts in APPROVED status can be closed (current status: DRAFT)"
    );
}

#[test]
async fn test_get_post_not_found_is_404() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;

    let response = handlers::get_post(alice, State(state), ValidatedPath(Uuid::new_v4()))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[test]
async fn test_get_all_posts_requires_admin() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;
    create_draft(&state, &alice).await;

    let err = handlers::get_all_posts(alice, State(state.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let Json(all) = handlers::get_all_posts(admin_user(), State(state)).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
async fn test_add_comment_returns_201() {
    let state = create_test_state();
    let alice = register(&state, "alice").await;
    let id = create_draft(&state, &alice).await;

    let payload = CreateCommentRequest {
        text: "Bringing snacks".to_string(),
    };
    let response = handlers::add_comment(alice, State(state), ValidatedPath(id), ValidatedJson(payload))
        .await
        .into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["text"], "Bringing snacks");
    assert_eq!(body["postId"], id.to_string());
    assert_eq!(body["createdByUsername"], "alice");
}

// --- Body Extraction & Error Bodies ---

#[test]
async fn test_validated_json_rejects_rule_violations_with_422() {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"username":"al","password":"secret1","email":"nope"}"#,
        ))
        .unwrap();

    let rejection = ValidatedJson::<RegisterRequest>::from_request(request, &())
        .await
        .err()
        .unwrap();
    let (status, body) = into_parts(rejection.into_response()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["username"].is_array());
    assert!(body["error"]["details"]["email"].is_array());
}

#[test]
async fn test_validated_json_rejects_malformed_json_with_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let rejection = ValidatedJson::<CreatePostRequest>::from_request(request, &())
        .await
        .err()
        .unwrap();

    assert_eq!(rejection.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_internal_errors_hide_their_cause() {
    let response = AppError::Internal("connection reset by peer".to_string()).into_response();
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(body["error"]["message"], "An internal error occurred");
}
