//! Archive part uploads with window-partitioned keys

use super::traits::ObjectStore;
use crate::core::export::archive::SealedPart;
use crate::domain::window::Window;
use crate::domain::Result;
use std::sync::Arc;

const ROOT_PREFIX: &str = "events";

/// Uploads sealed archive parts under
/// `events/integration=<id>/year=…/month=…/day=…/hour=…/<file>`.
pub struct ArchiveUploader {
    store: Arc<dyn ObjectStore>,
}

impl ArchiveUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Object key for a sealed part, partitioned by its window start.
    pub fn key_for(part: &SealedPart) -> String {
        let partition = Window::starting_at(part.window_start()).partition();
        format!(
            "{ROOT_PREFIX}/integration={}/year={:04}/month={:02}/day={:02}/hour={:02}/{}",
            part.integration_id(),
            partition.year,
            partition.month,
            partition.day,
            partition.hour,
            part.file_name(),
        )
    }

    /// Upload one part; returns the object key it was stored under.
    pub async fn upload(&self, part: &SealedPart) -> Result<String> {
        let key = Self::key_for(part);
        self.store
            .put_file(&key, part.path(), "application/zip")
            .await?;

        tracing::info!(
            integration_id = %part.integration_id(),
            part_index = part.index(),
            bytes = part.bytes_written(),
            key = %key,
            "Uploaded archive part"
        );
        Ok(key)
    }

    /// Most recently modified archive keys, for status reporting.
    pub async fn recent_archives(&self, max: usize) -> Result<Vec<String>> {
        self.store.list(&format!("{ROOT_PREFIX}/"), max).await
    }
}
