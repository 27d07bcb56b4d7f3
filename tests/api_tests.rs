use bulletin_board::{
    AppConfig, AppState, create_router,
    config::{AdminSeed, Env},
    models::{CommentView, LoginResponse, PostView, UserView},
    repository::{InMemoryRepository, RepositoryState},
    services::AccountService,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: Client,
}

/// Serves the full router over an in-memory store on an ephemeral port.
async fn spawn_app(env: Env) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };

    AccountService::new(repo.as_ref(), &config)
        .ensure_admin(&AdminSeed {
            username: ADMIN_USERNAME.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            email: "admin@example.com".to_string(),
        })
        .await
        .expect("Failed to seed admin");

    let router = create_router(AppState { repo, config });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn register(&self, username: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({
                "username": username,
                "password": "secret1",
                "email": format!("{}@example.com", username),
            }))
            .send()
            .await
            .expect("register request failed")
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(response.status(), StatusCode::OK);
        let body: LoginResponse = response.json().await.unwrap();
        body.token
    }

    /// Registers and logs in a regular user, returning its bearer token.
    async fn user_token(&self, username: &str) -> String {
        assert_eq!(self.register(username).await.status(), StatusCode::CREATED);
        self.login(username, "secret1").await
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    async fn create_post(&self, token: &str, title: &str) -> PostView {
        let response = self
            .client
            .post(self.url("/api/posts"))
            .bearer_auth(token)
            .json(&json!({ "title": title, "description": "details", "type": "ISSUE" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    async fn put(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app(Env::Production).await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app(Env::Production).await;
    let response = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"].get("/api/posts/{id}/approve").is_some());
}

#[tokio::test]
async fn test_register_twice_conflicts() {
    let app = spawn_app(Env::Production).await;

    let first = app.register("alice").await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let user: UserView = first.json().await.unwrap();
    assert_eq!(user.username, "alice");

    let second = app.register("alice").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(second).await, "CONFLICT");
}

#[tokio::test]
async fn test_register_validation_error() {
    let app = spawn_app(Env::Production).await;
    let response = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "username": "x", "password": "1", "email": "bad" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_401() {
    let app = spawn_app(Env::Production).await;
    app.register("alice").await;

    let response = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = spawn_app(Env::Production).await;

    for path in ["/auth/me", "/api/posts", "/api/posts/approved", "/api/posts/user/posts"] {
        let response = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let response = app
        .client
        .post(app.url("/api/posts"))
        .json(&json!({ "title": "t", "type": "OTHER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_post_id_is_a_json_400() {
    let app = spawn_app(Env::Production).await;
    let alice = app.user_token("alice").await;
    let admin = app.admin_token().await;

    let response = app.get(&alice, "/api/posts/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers()[reqwest::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");
    assert_eq!(error_code(response).await, "BAD_REQUEST");

    let response = app.put(&admin, "/api/posts/not-a-uuid/approve").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "BAD_REQUEST");

    let response = app.get(&alice, "/api/posts/123/comments").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "BAD_REQUEST");
}

#[tokio::test]
async fn test_me_returns_the_token_owner() {
    let app = spawn_app(Env::Production).await;
    let token = app.user_token("alice").await;

    let response = app.get(&token, "/auth/me").await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: UserView = response.json().await.unwrap();
    assert_eq!(me.username, "alice");
}

#[tokio::test]
async fn test_full_post_lifecycle_and_visibility() {
    let app = spawn_app(Env::Production).await;
    let alice = app.user_token("alice").await;
    let bob = app.user_token("bob").await;
    let admin = app.admin_token().await;

    let post = app.create_post(&alice, "Broken swing in the park").await;
    let path = format!("/api/posts/{}", post.id);

    // Draft: owner and admin can read, bob cannot.
    assert_eq!(app.get(&alice, &path).await.status(), StatusCode::OK);
    assert_eq!(app.get(&admin, &path).await.status(), StatusCode::OK);
    assert_eq!(app.get(&bob, &path).await.status(), StatusCode::FORBIDDEN);

    // Only the owner submits, and only once.
    let by_bob = app.put(&bob, &format!("{}/submit", path)).await;
    assert_eq!(by_bob.status(), StatusCode::FORBIDDEN);
    let submitted = app.put(&alice, &format!("{}/submit", path)).await;
    assert_eq!(submitted.status(), StatusCode::OK);
    let again = app.put(&alice, &format!("{}/submit", path)).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(again).await, "INVALID_OPERATION");

    // Approve is admin-only, even for the owner.
    let by_owner = app.put(&alice, &format!("{}/approve", path)).await;
    assert_eq!(by_owner.status(), StatusCode::FORBIDDEN);
    let approved = app.put(&admin, &format!("{}/approve", path)).await;
    assert_eq!(approved.status(), StatusCode::OK);
    let approved: PostView = approved.json().await.unwrap();
    assert_eq!(approved.status.as_str(), "APPROVED");

    assert_eq!(app.get(&bob, &path).await.status(), StatusCode::OK);

    // Close from APPROVED.
    let closed = app.put(&admin, &format!("{}/close", path)).await;
    assert_eq!(closed.status(), StatusCode::OK);
    assert_eq!(app.get(&bob, &path).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assign_update_note() {
    let app = spawn_app(Env::Production).await;
    let alice = app.user_token("alice").await;
    let admin = app.admin_token().await;
    let post = app.create_post(&alice, "Leaking hydrant").await;
    let path = app.url(&format!("/api/posts/{}/assign-update", post.id));

    let by_user = app
        .client
        .put(&path)
        .bearer_auth(&alice)
        .json(&json!({ "note": "please" }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_user.status(), StatusCode::FORBIDDEN);

    let by_admin = app
        .client
        .put(&path)
        .bearer_auth(&admin)
        .json(&json!({ "note": "Reported to the water board" }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_admin.status(), StatusCode::OK);
    let body: Value = by_admin.json().await.unwrap();
    assert_eq!(body["assignedUpdate"], "Reported to the water board");
}

#[tokio::test]
async fn test_listings() {
    let app = spawn_app(Env::Production).await;
    let alice = app.user_token("alice").await;
    let bob = app.user_token("bob").await;
    let admin = app.admin_token().await;

    let draft = app.create_post(&alice, "draft").await;
    let approved = app.create_post(&bob, "approved").await;
    app.put(&bob, &format!("/api/posts/{}/submit", approved.id)).await;
    app.put(&admin, &format!("/api/posts/{}/approve", approved.id)).await;

    // All posts: admin only.
    assert_eq!(app.get(&alice, "/api/posts").await.status(), StatusCode::FORBIDDEN);
    let all: Vec<PostView> = app.get(&admin, "/api/posts").await.json().await.unwrap();
    assert_eq!(all.len(), 2);

    // Approved: only APPROVED posts.
    let listed: Vec<PostView> = app.get(&alice, "/api/posts/approved").await.json().await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![approved.id]);

    // Mine: own posts at any status.
    let mine: Vec<PostView> = app.get(&alice, "/api/posts/user/posts").await.json().await.unwrap();
    let ids: Vec<Uuid> = mine.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![draft.id]);
}

#[tokio::test]
async fn test_comment_gate_over_http() {
    let app = spawn_app(Env::Production).await;
    let alice = app.user_token("alice").await;
    let bob = app.user_token("bob").await;
    let admin = app.admin_token().await;

    let post = app.create_post(&alice, "Lost umbrella").await;
    let comments = app.url(&format!("/api/posts/{}/comments", post.id));

    let blocked = app
        .client
        .post(&comments)
        .bearer_auth(&bob)
        .json(&json!({ "text": "seen it?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.get(&bob, &format!("/api/posts/{}/comments", post.id)).await.status(), StatusCode::FORBIDDEN);

    let own = app
        .client
        .post(&comments)
        .bearer_auth(&alice)
        .json(&json!({ "text": "It was blue" }))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::CREATED);

    app.put(&alice, &format!("/api/posts/{}/submit", post.id)).await;
    app.put(&admin, &format!("/api/posts/{}/approve", post.id)).await;

    let listed: Vec<CommentView> = app
        .get(&bob, &format!("/api/posts/{}/comments", post.id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].created_by_username, "alice");
}

#[tokio::test]
async fn test_local_bypass_header_over_http() {
    let app = spawn_app(Env::Local).await;
    let response = app.register("alice").await;
    let alice: UserView = response.json().await.unwrap();

    let response = app
        .client
        .get(app.url("/auth/me"))
        .header("x-user-id", alice.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
