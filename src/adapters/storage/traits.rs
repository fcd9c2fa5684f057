//! Storage abstraction traits
//!
//! The blob store is an external collaborator: the pipeline only needs an
//! opaque put/get interface plus a narrow checkpoint load/save seam. Both
//! traits are consumed through `Arc<dyn …>` and swapped for in-memory
//! fakes in tests.

use crate::core::state::Checkpoint;
use crate::domain::Result;
use async_trait::async_trait;
use std::path::Path;

/// Opaque durable object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file to `key`.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;

    /// Upload an in-memory payload to `key`.
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Fetch an object; `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Keys under `prefix`, most recently modified first, at most `max`.
    async fn list(&self, prefix: &str, max: usize) -> Result<Vec<String>>;
}

/// Persistent per-integration checkpoint storage.
///
/// `load` never fails on absence: a missing checkpoint is manufactured from
/// the configured initial position. `save` unconditionally overwrites and
/// stamps the update time. No optimistic concurrency; the orchestrator
/// guarantees one pipeline per integration.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint for an integration, manufacturing a default when
    /// none exists yet.
    async fn load(&self, integration_id: &str) -> Result<Checkpoint>;

    /// Persist a checkpoint, overwriting any previous value.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;
}
