//! Bounded fan-out across integrations
//!
//! Spawns one window pipeline per integration into a worker pool sized
//! `min(configured, integration count, available parallelism)`, waits with
//! progress logging up to the run deadline, then escalates: cooperative
//! cancellation first, forced aborts after a grace period. Integrations
//! abandoned at the deadline count as failures and leave their checkpoints
//! unadvanced.

use crate::adapters::query::EventStore;
use crate::adapters::storage::{ArchiveUploader, CheckpointStore};
use crate::core::export::pipeline::{PipelineSettings, WindowPipeline};
use crate::core::export::summary::{PipelineReport, RunSummary};
use crate::domain::{ExportError, Integration, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// Fixed interval between progress log lines while waiting on workers.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(300);

/// Deadline and drain settings for one run.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Configured upper bound on parallel pipelines
    pub max_parallel: usize,

    /// Overall run deadline
    pub max_duration: Duration,

    /// Grace period after cancellation, and the post-run settle delay
    pub drain_delay: Duration,
}

/// Runs one window pipeline per integration, bounded and deadlined.
pub struct Orchestrator {
    integrations: Vec<Integration>,
    events: Arc<dyn EventStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    uploader: Arc<ArchiveUploader>,
    pipeline_settings: PipelineSettings,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        integrations: Vec<Integration>,
        events: Arc<dyn EventStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        uploader: Arc<ArchiveUploader>,
        pipeline_settings: PipelineSettings,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            integrations,
            events,
            checkpoints,
            uploader,
            pipeline_settings,
            settings,
        }
    }

    /// Worker pool size for this run.
    fn pool_size(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.settings
            .max_parallel
            .min(self.integrations.len())
            .min(available)
            .max(1)
    }

    /// Run every integration pipeline and aggregate the outcomes.
    ///
    /// `shutdown` is the process-level signal (SIGINT/SIGTERM); it feeds
    /// the same cooperative cancellation path as the run deadline.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new();
        let total = self.integrations.len();

        if total == 0 {
            tracing::info!("No integrations to process");
            return summary;
        }

        let run_id = uuid::Uuid::new_v4();
        let pool = self.pool_size();
        tracing::info!(
            run_id = %run_id,
            workers = pool,
            integrations = total,
            configured_max = self.settings.max_parallel,
            "Launching integration workers"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let forwarder = Self::forward_shutdown(shutdown, cancel_tx.clone());

        let semaphore = Arc::new(Semaphore::new(pool));
        let mut workers: JoinSet<(String, Result<PipelineReport>)> = JoinSet::new();

        for integration in self.integrations.clone() {
            let semaphore = semaphore.clone();
            let pipeline = WindowPipeline::new(
                integration.clone(),
                self.events.clone(),
                self.checkpoints.clone(),
                self.uploader.clone(),
                self.pipeline_settings.clone(),
                cancel_rx.clone(),
            );

            workers.spawn(async move {
                let integration_id = integration.id().to_string();
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            integration_id,
                            Err(ExportError::Task("worker pool closed".to_string())),
                        )
                    }
                };
                let result = pipeline.run().await;
                drop(permit);
                (integration_id, result)
            });
        }

        let deadline = tokio::time::sleep(self.settings.max_duration);
        tokio::pin!(deadline);
        let mut progress = tokio::time::interval(PROGRESS_INTERVAL);

        let mut deadline_expired = false;
        while !workers.is_empty() {
            tokio::select! {
                joined = workers.join_next() => {
                    match joined {
                        Some(Ok((integration_id, result))) => {
                            Self::record(&mut summary, integration_id, result);
                        }
                        Some(Err(join_err)) if !join_err.is_cancelled() => {
                            tracing::error!(error = %join_err, "Integration worker terminated abnormally");
                        }
                        Some(Err(_)) | None => {}
                    }
                }
                _ = progress.tick() => {
                    tracing::info!(
                        completed = summary.outcomes().len(),
                        total,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Waiting for integration workers to finish"
                    );
                }
                _ = &mut deadline => {
                    deadline_expired = true;
                    tracing::warn!(
                        elapsed_secs = started.elapsed().as_secs(),
                        "Run deadline reached, requesting cooperative cancellation"
                    );
                    let _ = cancel_tx.send(true);
                    break;
                }
            }
        }

        if deadline_expired && !workers.is_empty() {
            self.drain_after_deadline(&mut workers, &mut summary).await;
        }

        // anything still unaccounted for was abandoned; its checkpoint is
        // wherever it last advanced, so the next run resumes there
        for integration in &self.integrations {
            if !summary.has_outcome(integration.id()) {
                summary.record_failure(
                    integration.id().to_string(),
                    "abandoned at run deadline".to_string(),
                );
            }
        }

        forwarder.abort();

        tracing::info!(
            run_id = %run_id,
            drain_delay_secs = self.settings.drain_delay.as_secs(),
            "Worker pool drained, waiting for run telemetry to settle"
        );
        tokio::time::sleep(self.settings.drain_delay).await;

        summary.set_duration(started.elapsed());
        summary
    }

    /// Give cancelled workers a grace period, then abort the stragglers.
    async fn drain_after_deadline(
        &self,
        workers: &mut JoinSet<(String, Result<PipelineReport>)>,
        summary: &mut RunSummary,
    ) {
        let grace = self.settings.drain_delay;
        let graceful = async {
            while let Some(joined) = workers.join_next().await {
                if let Ok((integration_id, result)) = joined {
                    Self::record(summary, integration_id, result);
                }
            }
        };

        if tokio::time::timeout(grace, graceful).await.is_err() {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Grace period elapsed, aborting remaining integration workers"
            );
            workers.abort_all();
            while let Some(joined) = workers.join_next().await {
                if let Ok((integration_id, result)) = joined {
                    Self::record(summary, integration_id, result);
                }
            }
        }
    }

    fn record(summary: &mut RunSummary, integration_id: String, result: Result<PipelineReport>) {
        match result {
            Ok(report) => {
                tracing::info!(
                    integration_id = %integration_id,
                    windows = report.windows_processed,
                    events = report.events_exported,
                    "Integration completed"
                );
                summary.record_success(integration_id, report);
            }
            Err(e) => {
                tracing::error!(
                    integration_id = %integration_id,
                    error = %e,
                    "Integration failed"
                );
                summary.record_failure(integration_id, e.to_string());
            }
        }
    }

    /// Bridge the process shutdown signal into the run-level cancel channel.
    fn forward_shutdown(
        mut shutdown: watch::Receiver<bool>,
        cancel_tx: watch::Sender<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if *shutdown.borrow() {
                    let _ = cancel_tx.send(true);
                    break;
                }
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
