//! Export state tracking

pub mod checkpoint;

pub use checkpoint::Checkpoint;
