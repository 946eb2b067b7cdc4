//! Headless studio: generates a story, runs the pipeline and plays the
//! result on the timeline, logging every event.

pub mod config;
pub mod studio;

pub use config::WorkerConfig;
pub use studio::{log_events, ProductionSummary, Studio};
