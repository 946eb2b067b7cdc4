//! External generation collaborators: story, image, video and speech.
//!
//! [`service::GenerationService`] is the seam the pipeline depends on;
//! [`client::GeminiClient`] implements it over the Gemini REST API.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod media;
pub mod messages;
pub mod poll;
pub mod probe;
pub mod service;
pub mod story;
pub mod wav;

pub use client::GeminiClient;
pub use config::{ConfigError, GeminiConfig};
pub use error::GenerationError;
pub use poll::PollPolicy;
pub use probe::{MediaProbe, WavProbe};
pub use service::GenerationService;
