//! Export engine: pager, archive writer, window pipeline, orchestrator

pub mod archive;
pub mod orchestrator;
pub mod pager;
pub mod pipeline;
pub mod summary;

pub use archive::{ArchiveWriter, SealedPart};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use pager::WindowPager;
pub use pipeline::{PipelineSettings, WindowPipeline};
pub use summary::{IntegrationOutcome, IntegrationStatus, PipelineReport, RunSummary};
