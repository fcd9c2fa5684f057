//! Core domain types and models

pub mod errors;
pub mod integration;
pub mod result;
pub mod window;

pub use errors::{ArchiveError, ExportError, QueryError, StorageError};
pub use integration::Integration;
pub use result::Result;
pub use window::Window;
