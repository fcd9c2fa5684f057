//! Checkpoint persistence over the object store
//!
//! One JSON document per integration. Absence is not an error: the store
//! manufactures an initial checkpoint from the configured starting
//! position, so a first run simply begins at the lookback (or the epoch).

use super::traits::{CheckpointStore, ObjectStore};
use crate::config::InitialPosition;
use crate::core::state::Checkpoint;
use crate::domain::{Result, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const ROOT_PREFIX: &str = "checkpoints";

fn checkpoint_key(integration_id: &str) -> String {
    format!("{ROOT_PREFIX}/integration={integration_id}/checkpoint.json")
}

/// Production [`CheckpointStore`] keeping one JSON object per integration.
pub struct RemoteCheckpointStore {
    store: Arc<dyn ObjectStore>,
    initial_position: InitialPosition,
    lookback_hours: u32,
}

impl RemoteCheckpointStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        initial_position: InitialPosition,
        lookback_hours: u32,
    ) -> Self {
        Self {
            store,
            initial_position,
            lookback_hours,
        }
    }
}

#[async_trait]
impl CheckpointStore for RemoteCheckpointStore {
    async fn load(&self, integration_id: &str) -> Result<Checkpoint> {
        let key = checkpoint_key(integration_id);

        let bytes = match self.store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                let initial =
                    Checkpoint::initial(integration_id, self.initial_position, self.lookback_hours);
                tracing::info!(
                    integration_id,
                    start = %initial.last_processed_timestamp,
                    "No checkpoint found, starting from initial position"
                );
                return Ok(initial);
            }
            Err(e) => {
                return Err(StorageError::CheckpointLoad {
                    integration_id: integration_id.to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::InvalidObject {
                key,
                message: e.to_string(),
            }
            .into()
        })
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let key = checkpoint_key(&checkpoint.integration_id);

        let stamped = Checkpoint {
            updated_at: Utc::now(),
            ..checkpoint.clone()
        };

        let payload = serde_json::to_vec(&stamped)?;
        self.store
            .put_bytes(&key, payload, "application/json")
            .await
            .map_err(|e| {
                StorageError::CheckpointSave {
                    integration_id: checkpoint.integration_id.clone(),
                    message: e.to_string(),
                }
            })?;

        tracing::debug!(
            integration_id = %checkpoint.integration_id,
            last_processed = %checkpoint.last_processed_timestamp,
            "Saved checkpoint"
        );
        Ok(())
    }
}
