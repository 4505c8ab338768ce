//! DeepScout API Gateway
//!
//! The public entry point for one-click research links.
//! Handles:
//! - Signed link verification
//! - Research request intake
//! - Request status lookup
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{routing::get, Router};
use deepscout_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    metrics,
    token::LinkSigner,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub signer: LinkSigner,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration before anything else; a broken config is fatal
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.observability);

    info!("Starting DeepScout API Gateway v{}", deepscout_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics; descriptions only reach an already-installed recorder
    metrics::install_exporter(&config.observability)?;
    metrics::register_metrics();

    // The gateway cannot verify links without a secret
    let signer = LinkSigner::from_config(&config.auth)?;

    // Initialize database connection and schema
    let db = DbPool::new(&config.database).await?;
    db.bootstrap().await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        signer,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber from observability configuration
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Link intake and status routes, rate limited; health probes stay open
    let mut research_routes = Router::new()
        .route("/research", get(handlers::research::request_research))
        .route(
            "/research/requests/{id}",
            get(handlers::requests::get_request),
        );

    if state.config.rate_limit.enabled {
        let limit = state.config.rate_limit.requests_per_second;
        let limiter =
            middleware::rate_limit::create_rate_limiter(limit, state.config.rate_limit.burst);
        research_routes = research_routes.layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                let limiter = limiter.clone();
                async move {
                    middleware::rate_limit::rate_limit_middleware(request, next, limiter, limit)
                        .await
                }
            },
        ));
    }

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(research_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
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
