//! Polling cycle for pending research requests
//!
//! Each cycle drains the current backlog: every pending request is reserved
//! in one batch update, then resolved one at a time. A request resolves to
//! `complete` with a stored report or to `error` with no report; delivery of
//! the notification email happens after the outcome is stored and never
//! changes it.

use deepscout_common::config::AppConfig;
use deepscout_common::db::models::{RequestStatus, ResearchRequest};
use deepscout_common::db::DbPool;
use deepscout_common::errors::{AppError, Result};
use deepscout_common::generator::Generator;
use deepscout_common::metrics;
use deepscout_common::notifier::{subject_line, Notifier};
use deepscout_common::Repository;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Per-request time limits for a worker instance
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Upper bound on a single report generation
    pub generation_timeout: Duration,
    /// Upper bound on a single notification send
    pub notify_timeout: Duration,
}

impl ProcessorConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            generation_timeout: config.generation_timeout(),
            notify_timeout: config.notify_timeout(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(300),
            notify_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome counts for a single polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Pending requests found at the start of the cycle
    pub pending: usize,
    /// Requests the batch reservation moved to `in_progress`
    pub claimed: u64,
    /// Requests that ended the cycle complete with a stored report
    pub completed: u64,
    /// Requests that ended the cycle in the error state
    pub failed: u64,
}

/// Drains pending research requests into terminal states
pub struct ResearchProcessor {
    repository: Repository,
    generator: Arc<dyn Generator>,
    notifier: Arc<dyn Notifier>,
    config: ProcessorConfig,
}

impl ResearchProcessor {
    /// Create a new processor backed by the given pool and providers
    pub fn new(
        db_pool: DbPool,
        generator: Arc<dyn Generator>,
        notifier: Arc<dyn Notifier>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            repository: Repository::new(db_pool),
            generator,
            notifier,
            config,
        }
    }

    /// Run one polling cycle over the current backlog
    ///
    /// Returns the cycle counts. Request-level failures are absorbed into the
    /// counts; an `Err` here means the cycle itself could not run, usually a
    /// database problem, and the caller is expected to retry on the next tick.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let cycle_start = Instant::now();
        let mut stats = CycleStats::default();

        let pending = self
            .repository
            .find_requests_by_status(RequestStatus::Pending)
            .await?;
        stats.pending = pending.len();
        metrics::record_backlog(pending.len());

        if pending.is_empty() {
            info!("No pending research requests");
            metrics::record_cycle(cycle_start.elapsed().as_secs_f64(), 0, 0, 0);
            return Ok(stats);
        }

        info!(count = pending.len(), "Found pending research requests");

        // Reserve the whole batch up front; nothing is generated until every
        // fetched request has left the pending state
        let ids: Vec<Uuid> = pending.iter().map(|request| request.id).collect();
        stats.claimed = self.repository.reserve_requests(&ids).await?;
        info!(reserved = stats.claimed, "Marked requests as in_progress");

        for request in &pending {
            match self.resolve(request).await {
                Ok(()) => stats.completed += 1,
                Err(err) => {
                    stats.failed += 1;
                    error!(request_id = %request.id, error = %err, "Research request failed");
                }
            }
        }

        metrics::record_cycle(
            cycle_start.elapsed().as_secs_f64(),
            stats.claimed,
            stats.completed,
            stats.failed,
        );
        Ok(stats)
    }

    /// Resolve one reserved request to a terminal state
    #[instrument(skip(self, request), fields(request_id = %request.id, area = %request.area_of_interest))]
    async fn resolve(&self, request: &ResearchRequest) -> Result<()> {
        info!("Starting deep research");

        let report = match self.generate_report(&request.area_of_interest).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "Report generation failed, marking request as error");
                self.repository.fail_request(request.id).await?;
                return Err(err);
            }
        };

        self.repository
            .complete_request(request.id, report.clone())
            .await?;
        info!(report_chars = report.len(), "Research request completed");

        self.deliver(request, &report).await;

        Ok(())
    }

    async fn generate_report(&self, topic: &str) -> Result<String> {
        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(topic),
        )
        .await;

        let result = match outcome {
            Ok(Ok(report)) if report.trim().is_empty() => Err(AppError::GenerationError {
                message: "provider returned an empty report".to_string(),
            }),
            Ok(Ok(report)) => Ok(report),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AppError::GenerationTimeout {
                timeout_ms: self.config.generation_timeout.as_millis() as u64,
            }),
        };

        metrics::record_generation(
            start.elapsed().as_secs_f64(),
            self.generator.model_name(),
            result.is_ok(),
        );
        result
    }

    /// Send the completion email for a stored report
    ///
    /// Delivery is best effort. The request has already been marked complete,
    /// and a failed or timed-out send is logged without touching it; the
    /// report stays readable through the API either way.
    async fn deliver(&self, request: &ResearchRequest, report: &str) {
        let subject = subject_line(&request.area_of_interest);
        let outcome = tokio::time::timeout(
            self.config.notify_timeout,
            self.notifier
                .notify(&request.requested_by, &subject, report),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                metrics::record_notification(true);
                info!(recipient = %request.requested_by, "Report notification sent");
            }
            Ok(Err(err)) => {
                metrics::record_notification(false);
                error!(
                    recipient = %request.requested_by,
                    error = %err,
                    "Failed to send report notification"
                );
            }
            Err(_) => {
                metrics::record_notification(false);
                error!(
                    recipient = %request.requested_by,
                    timeout_secs = self.config.notify_timeout.as_secs(),
                    "Report notification timed out"
                );
            }
        }
    }
}
