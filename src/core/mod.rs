//! Business logic: the export engine and state tracking

pub mod export;
pub mod state;
