//! Domain error types
//!
//! Error hierarchy for the exporter. All errors are domain-specific and
//! don't expose third-party types; adapters map transport/SDK failures into
//! these variants at the boundary.

use thiserror::Error;

/// Main exporter error type
///
/// This is the primary error type used throughout the application.
/// It wraps source-specific error types and provides context for error
/// handling at the orchestrator boundary.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// OAuth token acquisition failed; fatal to the whole run
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Query protocol errors (submit/poll against the event store)
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Local archive staging errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Object storage errors (uploads, checkpoints)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Worker task failures (panics, forced aborts)
    #[error("Task error: {0}")]
    Task(String),
}

/// Query-protocol errors
///
/// Errors from the asynchronous submit/poll protocol. These abort the
/// current window and with it the owning integration's pipeline; sibling
/// integrations are unaffected.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Network-level failure talking to the query service
    #[error("Query transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from submit or poll
    #[error("Query HTTP error: status {status}: {body}")]
    Http { status: u16, body: String },

    /// Query reached a terminal state other than SUCCEEDED, or the poll
    /// budget was exhausted while it was still RUNNING
    #[error("Query did not succeed; last observed state: {state}")]
    Failed { state: String },

    /// Query did not succeed immediately and no request token was returned
    #[error("Query returned no request token; state: {state}")]
    MissingToken { state: String },

    /// Response body did not match the expected shape
    #[error("Invalid query response: {0}")]
    InvalidResponse(String),
}

/// Archive staging errors
///
/// Failures while writing or sealing local archive parts. Fatal to the
/// current window; parts of the same window that were already uploaded are
/// not rolled back (at-least-once contract).
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Failed to create a staging file or open its payload entry
    #[error("Failed to open archive part: {0}")]
    Open(String),

    /// Failed to write an event into the current part
    #[error("Failed to write archive part: {0}")]
    Write(String),

    /// Failed to finish the container for the current part
    #[error("Failed to seal archive part: {0}")]
    Seal(String),
}

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Archive part upload failed
    #[error("Failed to upload archive part {key}: {message}")]
    Upload { key: String, message: String },

    /// Object could not be fetched
    #[error("Failed to download object {key}: {message}")]
    Download { key: String, message: String },

    /// Checkpoint object could not be read
    #[error("Failed to load checkpoint for integration {integration_id}: {message}")]
    CheckpointLoad {
        integration_id: String,
        message: String,
    },

    /// Checkpoint object could not be written
    #[error("Failed to save checkpoint for integration {integration_id}: {message}")]
    CheckpointSave {
        integration_id: String,
        message: String,
    },

    /// Object listing failed
    #[error("Failed to list objects under {prefix}: {message}")]
    List { prefix: String, message: String },

    /// Stored object did not match the expected shape
    #[error("Invalid stored object at {key}: {message}")]
    InvalidObject { key: String, message: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ExportError {
    fn from(err: toml::de::Error) -> Self {
        ExportError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_error_display() {
        let err = ExportError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_query_error_conversion() {
        let query_err = QueryError::Failed {
            state: "CANCELLED".to_string(),
        };
        let err: ExportError = query_err.into();
        assert!(matches!(err, ExportError::Query(_)));
        assert!(err.to_string().contains("CANCELLED"));
    }

    #[test]
    fn test_storage_error_conversion() {
        let storage_err = StorageError::Upload {
            key: "events/part1.zip".to_string(),
            message: "access denied".to_string(),
        };
        let err: ExportError = storage_err.into();
        assert!(matches!(err, ExportError::Storage(_)));
    }

    #[test]
    fn test_archive_error_conversion() {
        let archive_err = ArchiveError::Write("disk full".to_string());
        let err: ExportError = archive_err.into();
        assert!(matches!(err, ExportError::Archive(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ExportError = io_err.into();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ExportError = json_err.into();
        assert!(matches!(err, ExportError::Serialization(_)));
    }

    #[test]
    fn test_export_error_implements_std_error() {
        let err = ExportError::Auth("token request failed".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
