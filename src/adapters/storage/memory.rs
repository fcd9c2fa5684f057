//! In-memory storage fakes
//!
//! Drop-in [`ObjectStore`] / [`CheckpointStore`] implementations backed by
//! maps, used by unit and scenario tests. Listing order is
//! most-recently-stored first, mirroring the production listing contract.

use super::traits::{CheckpointStore, ObjectStore};
use crate::config::InitialPosition;
use crate::core::state::Checkpoint;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// In-memory [`ObjectStore`].
#[derive(Default)]
pub struct InMemoryObjectStore {
    // (key, bytes), insertion-ordered; a re-put moves the key to the back
    objects: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, key: &str, bytes: Vec<u8>) {
        let mut objects = self.objects.lock().expect("object store lock");
        objects.retain(|(existing, _)| existing != key);
        objects.push((key.to_string(), bytes));
    }

    /// Stored keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("object store lock")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Payload stored under `key`, if any.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("object store lock")
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("object store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.insert(key, bytes);
        Ok(())
    }

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.insert(key, bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.object(key))
    }

    async fn list(&self, prefix: &str, max: usize) -> Result<Vec<String>> {
        let objects = self.objects.lock().expect("object store lock");
        Ok(objects
            .iter()
            .rev()
            .filter(|(key, _)| key.starts_with(prefix))
            .take(max)
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// In-memory [`CheckpointStore`].
pub struct InMemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
    saves: Mutex<u64>,
    initial_position: InitialPosition,
    lookback_hours: u32,
}

impl InMemoryCheckpointStore {
    pub fn new(initial_position: InitialPosition, lookback_hours: u32) -> Self {
        Self {
            checkpoints: Mutex::new(HashMap::new()),
            saves: Mutex::new(0),
            initial_position,
            lookback_hours,
        }
    }

    /// Seed a checkpoint, as if written by a previous run.
    pub fn seed(&self, checkpoint: Checkpoint) {
        self.checkpoints
            .lock()
            .expect("checkpoint lock")
            .insert(checkpoint.integration_id.clone(), checkpoint);
    }

    /// Currently stored checkpoint for an integration, if any.
    pub fn stored(&self, integration_id: &str) -> Option<Checkpoint> {
        self.checkpoints
            .lock()
            .expect("checkpoint lock")
            .get(integration_id)
            .cloned()
    }

    /// Number of `save` calls observed.
    pub fn save_count(&self) -> u64 {
        *self.saves.lock().expect("save counter lock")
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, integration_id: &str) -> Result<Checkpoint> {
        if let Some(existing) = self.stored(integration_id) {
            return Ok(existing);
        }
        Ok(Checkpoint::initial(
            integration_id,
            self.initial_position,
            self.lookback_hours,
        ))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        *self.saves.lock().expect("save counter lock") += 1;
        self.seed(checkpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_object_store_round_trip() {
        let store = InMemoryObjectStore::new();
        store
            .put_bytes("a/b.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();

        assert_eq!(store.get("a/b.json").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.get("a/missing.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_is_recent_first_and_bounded() {
        let store = InMemoryObjectStore::new();
        for name in ["p/1", "p/2", "q/1", "p/3"] {
            store
                .put_bytes(name, Vec::new(), "application/octet-stream")
                .await
                .unwrap();
        }

        let listed = store.list("p/", 2).await.unwrap();
        assert_eq!(listed, vec!["p/3".to_string(), "p/2".to_string()]);
    }

    #[tokio::test]
    async fn test_checkpoint_store_counts_saves() {
        let store = InMemoryCheckpointStore::new(InitialPosition::Lookback, 24);
        assert_eq!(store.save_count(), 0);

        let checkpoint = Checkpoint::advanced_to(
            "IC-01-INT03-1-INT04",
            Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
        );
        store.save(&checkpoint).await.unwrap();

        assert_eq!(store.save_count(), 1);
        let loaded = store.load("IC-01-INT03-1-INT04").await.unwrap();
        assert_eq!(loaded.last_processed_timestamp, checkpoint.last_processed_timestamp);
    }
}
