//! Profile Directory - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod logging;
pub mod media;
pub mod routes;
pub mod slug;
pub mod state;
pub mod taxonomy;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use config::AppConfig;
use state::AppState;

/// Largest accepted request body: one full-size upload plus form overhead.
pub const MAX_BODY_SIZE: usize = media::MAX_FILE_SIZE + 2 * 1024 * 1024;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local dev frontend.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect::<Vec<HeaderValue>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::IF_NONE_MATCH])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    Router::new()
        .route("/api/admin/login", post(routes::auth::login))
        .route("/api/admin/verify", get(routes::auth::verify_session))
        .route("/api/admin/logout", post(routes::auth::logout))
        .route(
            "/api/profiles",
            get(routes::profiles::list_profiles).post(routes::profiles::create_profile),
        )
        .route(
            "/api/profiles/{slug}",
            get(routes::profiles::get_profile)
                .put(routes::profiles::update_profile)
                .delete(routes::profiles::delete_profile),
        )
        .route(
            "/api/tags",
            get(routes::tags::list_tags).post(routes::tags::create_tag),
        )
        .route(
            "/api/tags/sync",
            get(routes::tags::sync_status).post(routes::tags::sync_tags),
        )
        .route(
            "/api/tags/{id}",
            get(routes::tags::get_tag)
                .put(routes::tags::update_tag)
                .delete(routes::tags::delete_tag),
        )
        .route("/api/occupations", get(routes::occupations::list_occupations))
        .route("/api/browse", get(routes::browse::browse_root))
        .route("/api/browse/{*segments}", get(routes::browse::browse_path))
        .route(
            "/api/upload",
            post(routes::upload::upload_image)
                .delete(routes::upload::delete_image)
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .route("/api/images/{*path}", get(routes::images::serve_image))
        .route("/health", get(routes::health::health_ping))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let _log_guards = logging::init(&environment);

    routes::health::init_start_time();

    let config = AppConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Refusing to start: {e}"))?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    if std::env::var("DATABASE_URL").is_ok() {
        match db::init_pool(None).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT configuration")?;

    let app = create_app(AppState::new(config));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
