//! The generation collaborator seam.
//!
//! Everything above this crate talks to [`GenerationService`] only, so the
//! pipeline can run against the Gemini client or a scripted mock.

use aniflow_core::project::{AspectRatio, Project};
use aniflow_core::request::{ImageRequest, SpeechRequest, VideoRequest};
use async_trait::async_trait;

use crate::error::GenerationError;

/// External generation collaborator.
///
/// Every artifact is returned as a media reference string: a `data:` URI
/// or a fetchable URL.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Expand `topic` into a full project graph with the caller's aspect
    /// ratio applied.
    async fn generate_story(
        &self,
        topic: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Project, GenerationError>;

    /// Fails with [`GenerationError::EmptyPayload`] when no image comes back.
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, GenerationError>;

    /// Animate `request.source_image`. Credential problems surface as
    /// [`GenerationError::Unauthorized`].
    async fn generate_video(&self, request: &VideoRequest) -> Result<String, GenerationError>;

    /// Fails with [`GenerationError::EmptyPayload`] when no audio comes back.
    async fn generate_speech(&self, request: &SpeechRequest) -> Result<String, GenerationError>;
}
