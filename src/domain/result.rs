//! Result type alias for the exporter

use crate::domain::errors::ExportError;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExportError>;
