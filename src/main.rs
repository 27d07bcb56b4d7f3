use bulletin_board::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    services::AccountService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup sequence: configuration, logging, database pool and migrations,
/// bootstrap administrator, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request logs from tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bulletin_board=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: human readable.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.exposes_local_bypass() {
        tracing::warn!(
            "APP_ENV is local on non-loopback {}: x-user-id impersonation and the local JWT secret are enabled",
            config.bind_addr
        );
    }

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // Schema and the two seeded roles.
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Bootstrap Administrator
    if let Some(seed) = &config.bootstrap_admin {
        AccountService::new(repo.as_ref(), &config)
            .ensure_admin(seed)
            .await
            .expect("FATAL: Failed to create the bootstrap administrator.");
    }

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState { repo, config };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
