//! Chatbridge HTTP Gateway
//!
//! Serves the chat pipeline over HTTP.
//! Handles:
//! - `POST /chat` streaming answers as newline-delimited JSON
//! - Health and readiness checks
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use chatbridge_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    llm::GeminiClient,
    metrics::{self, metric_name, GENERATION_BUCKETS, LATENCY_BUCKETS},
    ChatPipeline,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Semaphore;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// One permit per open `/chat` body; held until the stream is dropped
    pub streams: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ChatPipeline>,
        metrics: Option<PrometheusHandle>,
        max_open_streams: usize,
    ) -> Self {
        Self {
            pipeline,
            metrics,
            streams: Arc::new(Semaphore::new(max_open_streams)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting Chatbridge gateway v{}", chatbridge_common::VERSION);

    let metrics_handle = if config.observability.metrics_enabled {
        Some(install_metrics_recorder()?)
    } else {
        None
    };
    metrics::register_metrics();

    // A missing credential is fatal before anything else is opened
    let generator = GeminiClient::new(&config.llm).map_err(|e| {
        error!(error = %e, "Failed to configure generation client");
        e
    })?;

    let db = DbPool::new(&config.database).await?;
    db.bootstrap().await?;

    let pipeline = ChatPipeline::new(Arc::new(Repository::new(db)), Arc::new(generator))
        .with_surface("http");

    let state = AppState::new(
        Arc::new(pipeline),
        metrics_handle,
        config.server.max_concurrent_requests,
    );

    let app = create_router(state, config.server.max_concurrent_requests);

    let addr = config.bind_address();
    info!(model = %config.llm.model, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn install_metrics_recorder() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(metric_name("request_duration_seconds")),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(metric_name("generation_duration_seconds")),
            GENERATION_BUCKETS,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Create the main application router
///
/// `max_concurrent_requests` bounds requests until their headers are sent;
/// open chat streams are bounded separately by `AppState::streams`.
pub fn create_router(state: AppState, max_concurrent_requests: usize) -> Router {
    // The chat page may be served from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::metrics::render))
        .route_layer(from_fn(middleware::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(cors)
        // Set runs before propagate, so both layers see the same id
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
