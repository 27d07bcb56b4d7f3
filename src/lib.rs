use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod password;
pub mod repository;
pub mod services;
pub mod validation;

// Routing split by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document built from the `#[utoipa::path]` handlers and the
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::get_me,
        handlers::create_post, handlers::submit_post, handlers::approve_post,
        handlers::reject_post, handlers::close_post, handlers::assign_update,
        handlers::get_post, handlers::get_all_posts, handlers::get_approved_posts,
        handlers::get_my_posts, handlers::add_comment, handlers::get_comments
    ),
    components(
        schemas(
            models::RoleName, models::PostType, models::PostStatus,
            models::RegisterRequest, models::LoginRequest, models::CreatePostRequest,
            models::AssignUpdateRequest, models::CreateCommentRequest,
            models::UserView, models::LoginResponse, models::PostView, models::CommentView,
        )
    ),
    tags(
        (name = "bulletin-board", description = "Community Bulletin Board API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, cheaply cloned state handed to every handler and extractor.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait (Postgres in production).
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated and admin routers. Resolving `AuthUser` here
/// rejects unauthenticated requests with 401 before any handler runs; the
/// resolved identity is stored in the request extensions so the handler's own
/// `AuthUser` extractor does not repeat the token check and user lookup.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, scoped and global middleware, and state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Protected routes. Merged before layering so `/api/posts` keeps its
    //    GET (admin) and POST (authenticated) methods on one path.
    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 3. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. A fresh UUID per request in `x-request-id`.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. One span per request, tagged with the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `http_request` span for `TraceLayer`, carrying method, uri and
/// the `x-request-id` so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
