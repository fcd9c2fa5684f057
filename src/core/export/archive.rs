//! Size-bounded rolling archive writer
//!
//! Events for one window are serialized one-per-line into a single
//! newline-delimited-JSON entry inside a ZIP container. When the cumulative
//! serialized size of the current part would cross the configured
//! threshold, the part is sealed and handed back for upload and a new part
//! opens under the next index; callers only see the sealed parts.
//!
//! Parts stage as named temp files in the configured staging directory and
//! are deleted when the [`SealedPart`] drops, so staging space is reclaimed
//! on success and failure alike.

use crate::domain::{ArchiveError, Result};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One sealed, upload-ready archive part.
///
/// Holds the staging file open; the file is removed from disk when this
/// value drops.
pub struct SealedPart {
    integration_id: String,
    window_start: DateTime<Utc>,
    index: u32,
    bytes_written: u64,
    file: NamedTempFile,
}

impl SealedPart {
    pub fn integration_id(&self) -> &str {
        &self.integration_id
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// 1-based part index within the window.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Cumulative serialized payload bytes (uncompressed).
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the staging file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Staging file name, used as the object name in the archive key.
    pub fn file_name(&self) -> String {
        self.file
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("part{}.zip", self.index))
    }
}

struct OpenPart {
    zip: ZipWriter<NamedTempFile>,
    index: u32,
    bytes_written: u64,
}

/// Rolling archive writer for one integration window.
pub struct ArchiveWriter {
    integration_id: String,
    window_start: DateTime<Utc>,
    staging_dir: PathBuf,
    max_part_bytes: u64,
    next_index: u32,
    current: Option<OpenPart>,
}

impl ArchiveWriter {
    pub fn new(
        integration_id: impl Into<String>,
        window_start: DateTime<Utc>,
        staging_dir: impl Into<PathBuf>,
        max_part_bytes: u64,
    ) -> Self {
        Self {
            integration_id: integration_id.into(),
            window_start,
            staging_dir: staging_dir.into(),
            max_part_bytes,
            next_index: 1,
            current: None,
        }
    }

    /// Append one event.
    ///
    /// Opens the first part lazily, so a window with no events never
    /// creates a staging file. Returns a sealed part when the write rolled
    /// the archive over; the caller uploads it before continuing.
    pub fn write(&mut self, event: &serde_json::Value) -> Result<Option<SealedPart>> {
        let line = serde_json::to_vec(event)?;
        let line_bytes = line.len() as u64 + 1;

        let should_roll = self
            .current
            .as_ref()
            .is_some_and(|part| {
                part.bytes_written > 0 && part.bytes_written + line_bytes > self.max_part_bytes
            });
        let mut rolled = None;
        if should_roll {
            rolled = Some(self.seal_current()?);
        }

        if self.current.is_none() {
            self.open_part()?;
        }
        let part = self.current.as_mut().expect("part opened above");

        part.zip
            .write_all(&line)
            .and_then(|_| part.zip.write_all(b"\n"))
            .map_err(|e| ArchiveError::Write(e.to_string()))?;
        part.bytes_written += line_bytes;

        Ok(rolled)
    }

    /// Seal the final part.
    ///
    /// Returns `None` when nothing was ever written: a zero-record window
    /// produces no archive at all.
    pub fn seal(mut self) -> Result<Option<SealedPart>> {
        if self.current.is_some() {
            Ok(Some(self.seal_current()?))
        } else {
            Ok(None)
        }
    }

    fn open_part(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.staging_dir)
            .map_err(|e| ArchiveError::Open(format!("staging dir: {e}")))?;

        let index = self.next_index;
        let file = tempfile::Builder::new()
            .prefix(&format!("events-{}-part{index}-", self.integration_id))
            .suffix(".zip")
            .tempfile_in(&self.staging_dir)
            .map_err(|e| ArchiveError::Open(e.to_string()))?;

        let mut zip = ZipWriter::new(file);
        zip.start_file(
            format!("{}_events.jsonl", self.integration_id),
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        )
        .map_err(|e| ArchiveError::Open(e.to_string()))?;

        self.current = Some(OpenPart {
            zip,
            index,
            bytes_written: 0,
        });
        self.next_index = index + 1;
        Ok(())
    }

    fn seal_current(&mut self) -> Result<SealedPart> {
        let part = self
            .current
            .take()
            .ok_or_else(|| ArchiveError::Seal("no open part".to_string()))?;

        let mut file = part
            .zip
            .finish()
            .map_err(|e| ArchiveError::Seal(e.to_string()))?;
        file.flush().map_err(|e| ArchiveError::Seal(e.to_string()))?;

        tracing::debug!(
            integration_id = %self.integration_id,
            part_index = part.index,
            bytes = part.bytes_written,
            "Sealed archive part"
        );

        Ok(SealedPart {
            integration_id: self.integration_id.clone(),
            window_start: self.window_start,
            index: part.index,
            bytes_written: part.bytes_written,
            file,
        })
    }
}
