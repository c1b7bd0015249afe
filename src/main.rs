// =============================================================================
// PRODUCTION STATUS SERVICE - Main Entry Point
// =============================================================================
// Classification service for the inventory and production system.
//
// WHAT THIS SERVICE DOES:
// - Derives product stock status and raw-material health bands
// - Renders the four-step progress model of a production batch
// - Groups notifications and activity logs into drawer sections
// - Caches per-viewer unread notification counts in Redis
// - Exposes Prometheus metrics for all of the above
//
// The derivation rules live in `classify` as pure functions; everything else
// here loads snapshots and serves the results.
// =============================================================================

mod classify;   // Pure derivation rules (classify/)
mod config;     // Configuration loading (config.rs)
mod context;    // Viewer context from gateway headers (context.rs)
mod db;         // Database operations (db.rs)
mod error;      // Error types (error.rs)
mod handlers;   // HTTP request handlers (handlers.rs)
mod metrics;    // Prometheus metrics setup (metrics.rs)
mod models;     // Data structures (models.rs)

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::metrics::setup_metrics;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by all handlers through State<Arc<AppState>>.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL pool
    pub db: Database,

    /// Redis connection for the unread-count cache
    pub redis: redis::aio::ConnectionManager,

    /// Renders /metrics
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,

    /// TTL for cached unread counts
    pub unread_cache_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Environment and logging
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok(); // .env is optional

    // RUST_LOG controls levels, e.g. RUST_LOG=info,production_status_service=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,production_status_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Production Status Service...");

    // -------------------------------------------------------------------------
    // STEP 2: Configuration and metrics
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        unread_cache_ttl_secs = config.unread_cache_ttl_secs,
        "Configuration loaded"
    );

    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 3: PostgreSQL
    // -------------------------------------------------------------------------
    let db = Database::connect(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    db.run_migrations().await?;
    info!("Database migrations completed");

    if config.seed_sample_data {
        db.seed_sample_data().await?;
        info!("Sample data checked");
    }

    // -------------------------------------------------------------------------
    // STEP 4: Redis
    // -------------------------------------------------------------------------
    // ConnectionManager reconnects automatically
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    info!("Connected to Redis");

    let state = Arc::new(AppState {
        db,
        redis: redis_conn,
        metrics_handle,
        unread_cache_ttl_secs: config.unread_cache_ttl_secs,
    });

    // -------------------------------------------------------------------------
    // STEP 5: Routes
    // -------------------------------------------------------------------------
    // Static segments (/alerts, /sections...) are matched before :id captures.
    let app = Router::new()
        // ----- Health, readiness & metrics -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))

        // ----- Products & materials -----
        .route("/api/v1/products", get(handlers::list_products))
        .route("/api/v1/products/alerts", get(handlers::product_alerts))
        .route("/api/v1/products/:id", get(handlers::get_product))
        .route("/api/v1/materials", get(handlers::list_materials))

        // ----- Production -----
        .route("/api/v1/production/batches", get(handlers::list_batches))
        .route(
            "/api/v1/production/batches/:id/progress",
            get(handlers::batch_progress),
        )
        .route(
            "/api/v1/production/stages/:stage",
            get(handlers::stage_progress),
        )

        // ----- Notifications -----
        .route("/api/v1/notifications", get(handlers::list_notifications))
        .route(
            "/api/v1/notifications/sections",
            get(handlers::notification_sections),
        )
        .route(
            "/api/v1/notifications/activity",
            get(handlers::activity_sections),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(handlers::unread_count),
        )
        .route("/api/v1/notifications/:id/read", post(handlers::mark_read))
        .route("/api/v1/notifications/:id/dismiss", post(handlers::dismiss))

        // ----- Middleware -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // -------------------------------------------------------------------------
    // STEP 6: Serve
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Production Status Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
