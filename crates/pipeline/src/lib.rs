//! Project Store, Generation Tasks and the Pipeline Orchestrator.
//!
//! - [`store::ProjectStore`] owns the project graph behind targeted,
//!   read-then-merge writes.
//! - [`tasks::GenerationTasks`] runs one external call per artifact and
//!   commits the result by entity id.
//! - [`orchestrator::PipelineOrchestrator`] sequences tasks across a whole
//!   project with pacing between calls.

pub mod orchestrator;
pub mod pacing;
pub mod reauth;
pub mod store;
pub mod tasks;

pub use orchestrator::{BatchError, BatchReport, EntryResult, PipelineOrchestrator};
pub use pacing::Pacing;
pub use reauth::{LogReauth, ReauthPrompt};
pub use store::{AssetTarget, ProjectStore, StoreError};
pub use tasks::{GenerationTasks, TaskError, TaskOutcome};
