//! Per-integration window pipeline
//!
//! The central state machine. Starting from the integration's checkpoint,
//! it walks hour windows up to a safety horizon behind "now"; for each
//! window it pages events into the rolling archive writer, uploads every
//! sealed part, and only then advances the checkpoint to the window end.
//! A window that yields no records advances the in-memory window cursor
//! without touching the checkpoint, so empty stretches cost at most
//! bounded reprocessing after a crash. Any error aborts this integration
//! with the in-flight window unrecorded; the next run repeats it.

use crate::adapters::query::EventStore;
use crate::adapters::storage::{ArchiveUploader, CheckpointStore};
use crate::core::export::archive::ArchiveWriter;
use crate::core::export::pager::WindowPager;
use crate::core::export::summary::PipelineReport;
use crate::core::state::Checkpoint;
use crate::domain::window::{horizon, truncate_to_hour};
use crate::domain::{Integration, Result, Window};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Tuning knobs for one pipeline, shared across integrations.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub page_size: usize,
    pub max_part_bytes: u64,
    pub staging_dir: PathBuf,
}

/// Sequential export pipeline for one integration.
///
/// Exclusively owns the integration's checkpoint and staging files for the
/// duration of the run; the orchestrator never starts two pipelines for
/// the same integration.
pub struct WindowPipeline {
    integration: Integration,
    events: Arc<dyn EventStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    uploader: Arc<ArchiveUploader>,
    settings: PipelineSettings,
    shutdown: watch::Receiver<bool>,
}

impl WindowPipeline {
    pub fn new(
        integration: Integration,
        events: Arc<dyn EventStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        uploader: Arc<ArchiveUploader>,
        settings: PipelineSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            integration,
            events,
            checkpoints,
            uploader,
            settings,
            shutdown,
        }
    }

    /// Run the pipeline to its horizon or until cancellation.
    pub async fn run(mut self) -> Result<PipelineReport> {
        let integration_id = self.integration.id().to_string();
        let mut report = PipelineReport::default();

        let checkpoint = self.checkpoints.load(&integration_id).await?;
        let mut window =
            Window::starting_at(truncate_to_hour(checkpoint.last_processed_timestamp));

        tracing::info!(
            integration_id = %integration_id,
            resume_from = %window.start(),
            "Starting integration pipeline"
        );

        while window.start() < horizon(Utc::now()) {
            if *self.shutdown.borrow() {
                tracing::info!(
                    integration_id = %integration_id,
                    window = %window,
                    "Cancellation requested, stopping before next window"
                );
                break;
            }

            tracing::info!(
                integration_id = %integration_id,
                window = %window,
                "Processing window"
            );

            self.process_window(window, &mut report).await?;
            window = window.next();
        }

        tracing::info!(
            integration_id = %integration_id,
            windows_processed = report.windows_processed,
            windows_skipped = report.windows_skipped,
            events = report.events_exported,
            parts = report.parts_uploaded,
            "Integration pipeline finished"
        );
        Ok(report)
    }

    /// Archive one window: fetch, write, upload, then checkpoint.
    async fn process_window(&mut self, window: Window, report: &mut PipelineReport) -> Result<()> {
        let integration_id = self.integration.id().to_string();

        let mut pager = WindowPager::new(
            self.events.clone(),
            self.integration.clone(),
            window,
            self.settings.page_size,
        );
        let mut writer = ArchiveWriter::new(
            integration_id.clone(),
            window.start(),
            &self.settings.staging_dir,
            self.settings.max_part_bytes,
        );

        let mut events_written: u64 = 0;
        let mut parts_uploaded: u64 = 0;
        let mut bytes_archived: u64 = 0;

        while let Some(batch) = pager.next_batch().await? {
            for event in &batch.events {
                if let Some(rolled) = writer.write(event)? {
                    bytes_archived += rolled.bytes_written();
                    self.uploader.upload(&rolled).await?;
                    parts_uploaded += 1;
                }
            }
            events_written += batch.len() as u64;
        }

        if let Some(last) = writer.seal()? {
            bytes_archived += last.bytes_written();
            self.uploader.upload(&last).await?;
            parts_uploaded += 1;
        }

        if parts_uploaded == 0 {
            tracing::info!(
                integration_id = %integration_id,
                window = %window,
                "No records in window"
            );
            report.windows_skipped += 1;
            return Ok(());
        }

        // every part of this window is durable; only now may the
        // checkpoint move past it
        self.checkpoints
            .save(&Checkpoint::advanced_to(&integration_id, window.end()))
            .await?;

        tracing::info!(
            integration_id = %integration_id,
            window = %window,
            events = events_written,
            parts = parts_uploaded,
            "Window archived and checkpoint updated"
        );

        report.windows_processed += 1;
        report.events_exported += events_written;
        report.parts_uploaded += parts_uploaded;
        report.bytes_archived += bytes_archived;
        Ok(())
    }
}
