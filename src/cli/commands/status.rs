//! Status command: show per-integration checkpoints and recent archives

use crate::adapters::storage::{
    build_client, ArchiveUploader, CheckpointStore, ObjectStore, RemoteCheckpointStore,
    S3ObjectStore,
};
use crate::config::load_config;
use crate::domain::integration::catalog;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// How many recent archive objects to list
    #[arg(long, default_value_t = 10)]
    pub recent: usize,
}

impl StatusArgs {
    /// Print checkpoint positions and recent archives, returning the exit code.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(1);
            }
        };

        let checkpoint_client =
            build_client(&config.storage, config.storage.checkpoint_role_arn.as_deref()).await;
        let checkpoint_objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
            checkpoint_client,
            config.storage.checkpoint_bucket.clone(),
        ));
        let checkpoints = RemoteCheckpointStore::new(
            checkpoint_objects,
            config.export.initial_position,
            config.export.lookback_hours,
        );

        println!("Checkpoints:");
        for integration in catalog() {
            match checkpoints.load(integration.id()).await {
                Ok(checkpoint) => println!(
                    "  {:<28} last processed {}  (updated {})",
                    integration.id(),
                    checkpoint.last_processed_timestamp,
                    checkpoint.updated_at
                ),
                Err(e) => {
                    eprintln!("  {:<28} error: {e}", integration.id());
                    return Ok(1);
                }
            }
        }

        let data_client =
            build_client(&config.storage, config.storage.data_role_arn.as_deref()).await;
        let data_store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
            data_client,
            config.storage.data_bucket.clone(),
        ));
        let uploader = ArchiveUploader::new(data_store);

        println!("Recent archives:");
        match uploader.recent_archives(self.recent).await {
            Ok(keys) if keys.is_empty() => println!("  (none)"),
            Ok(keys) => {
                for key in keys {
                    println!("  {key}");
                }
            }
            Err(e) => {
                eprintln!("  error: {e}");
                return Ok(1);
            }
        }

        Ok(0)
    }
}
