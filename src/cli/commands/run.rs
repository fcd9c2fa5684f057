//! Run command: execute the export across the integration catalog

use crate::adapters::query::{EventStore, QueryClient, TokenProvider};
use crate::adapters::storage::{
    build_client, ArchiveUploader, CheckpointStore, ObjectStore, RemoteCheckpointStore,
    S3ObjectStore,
};
use crate::config::load_config;
use crate::core::export::{
    IntegrationStatus, Orchestrator, OrchestratorSettings, PipelineSettings,
};
use crate::domain::integration::{catalog, find_by_code};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Restrict the run to a single integration code (e.g. IC-12)
    #[arg(long)]
    pub integration: Option<String>,
}

impl RunArgs {
    /// Execute the run command, returning the process exit code.
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Error: {e}");
                return Ok(1);
            }
        };

        let integrations = match &self.integration {
            Some(code) => match find_by_code(code) {
                Some(integration) => vec![integration],
                None => {
                    tracing::error!(code = %code, "Unknown integration code");
                    eprintln!("Error: unknown integration code: {code}");
                    return Ok(1);
                }
            },
            None => catalog(),
        };

        if integrations.is_empty() {
            tracing::info!("No integrations to process");
            return Ok(0);
        }
        tracing::info!(count = integrations.len(), "Found integrations to process");

        // token acquisition is fatal to the whole run, so it is checked
        // once before any pipeline starts
        let tokens = Arc::new(TokenProvider::new(config.oauth.clone()));
        if let Err(e) = tokens.access_token().await {
            tracing::error!(error = %e, "Startup authentication failed");
            eprintln!("Error: {e}");
            return Ok(1);
        }

        let events: Arc<dyn EventStore> = Arc::new(QueryClient::new(&config.query, tokens));

        let data_client =
            build_client(&config.storage, config.storage.data_role_arn.as_deref()).await;
        let checkpoint_client =
            build_client(&config.storage, config.storage.checkpoint_role_arn.as_deref()).await;

        let data_store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
            data_client,
            config.storage.data_bucket.clone(),
        ));
        let checkpoint_objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
            checkpoint_client,
            config.storage.checkpoint_bucket.clone(),
        ));

        let checkpoints: Arc<dyn CheckpointStore> = Arc::new(RemoteCheckpointStore::new(
            checkpoint_objects,
            config.export.initial_position,
            config.export.lookback_hours,
        ));
        let uploader = Arc::new(ArchiveUploader::new(data_store));

        let orchestrator = Orchestrator::new(
            integrations,
            events,
            checkpoints,
            uploader,
            PipelineSettings {
                page_size: config.query.page_size,
                max_part_bytes: config.export.max_part_bytes,
                staging_dir: PathBuf::from(&config.export.staging_dir),
            },
            OrchestratorSettings {
                max_parallel: config.export.max_parallel,
                max_duration: Duration::from_secs(config.export.max_duration_hours * 3600),
                drain_delay: Duration::from_secs(config.export.drain_delay_seconds),
            },
        );

        let summary = orchestrator.run(shutdown).await;

        let totals = summary.totals();
        println!(
            "Run finished in {:.0?}: {} succeeded, {} failed",
            summary.duration(),
            summary.succeeded_count(),
            summary.failed().len()
        );
        println!(
            "  windows archived: {}, skipped: {}, events: {}, parts: {}",
            totals.windows_processed,
            totals.windows_skipped,
            totals.events_exported,
            totals.parts_uploaded
        );
        for outcome in summary.failed() {
            if let IntegrationStatus::Failed(message) = &outcome.status {
                println!("  FAILED {}: {}", outcome.integration_id, message);
            }
        }

        if summary.success() {
            tracing::info!("All integration tasks completed successfully");
            Ok(0)
        } else {
            tracing::error!(
                failed = summary.failed().len(),
                "One or more integration tasks failed"
            );
            Ok(1)
        }
    }
}
