//! DeepScout Research Worker
//!
//! Background worker for the research request lifecycle.
//! Handles:
//! - Polling the store for pending requests
//! - Batch reservation so no request is picked up twice
//! - Report generation through the configured provider
//! - Completion email delivery

mod processor;

use crate::processor::{ProcessorConfig, ResearchProcessor};
use deepscout_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    generator::create_generator,
    metrics,
    notifier::create_notifier,
};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

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

    info!(
        "Starting DeepScout Research Worker v{}",
        deepscout_common::VERSION
    );

    // Initialize metrics; descriptions only reach an already-installed recorder
    metrics::install_exporter(&config.observability)?;
    metrics::register_metrics();

    // Providers must be fully configured before the first poll
    let generator = create_generator(&config.generator)?;
    let notifier = create_notifier(&config.notifier)?;
    info!(model = generator.model_name(), "Report generator ready");
    info!(provider = %config.notifier.provider, "Notifier ready");

    // Initialize database connection and schema
    let db = DbPool::new(&config.database).await?;
    db.bootstrap().await?;

    let processor = ResearchProcessor::new(
        db,
        generator,
        notifier,
        ProcessorConfig::from_config(&config),
    );

    info!(
        poll_interval_secs = config.worker.poll_interval_secs,
        "Research worker ready, starting polling loop..."
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    // The first tick fires immediately; Delay keeps a slow cycle from being
    // followed by a burst of catch-up polls
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // A shutdown signal during a cycle lets the in-flight batch finish
        // and is honored here before the next one starts
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        match processor.run_cycle().await {
            Ok(stats) if stats.pending > 0 => {
                info!(
                    pending = stats.pending,
                    claimed = stats.claimed,
                    completed = stats.completed,
                    failed = stats.failed,
                    "Polling cycle finished"
                );
            }
            Ok(_) => {}
            Err(err) => {
                // The next tick retries; a transient database outage must not
                // take the worker down
                error!(error = %err, "Polling cycle failed");
            }
        }
    }

    info!("Research worker shutdown complete");
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
