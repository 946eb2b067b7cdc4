//! [`GenerationService`] backed by the Gemini REST API.
//!
//! Story, image and speech are single `generateContent` calls. Video is a
//! long-running operation: submit, poll within the configured
//! [`PollPolicy`](crate::poll::PollPolicy) budget, then download the clip.

use std::time::Instant;

use aniflow_core::project::{AspectRatio, Project};
use aniflow_core::request::{ImageRequest, SpeechRequest, VideoRequest};
use async_trait::async_trait;

use crate::api::{GeminiApi, ENTITY_NOT_FOUND};
use crate::config::GeminiConfig;
use crate::error::GenerationError;
use crate::media::{data_uri_from_base64, decode_base64, split_data_uri, to_data_uri};
use crate::messages::{
    Content, GenerateContentRequest, GenerationConfig, ImageConfig, Operation, Part,
    PredictVideoRequest, SpeechConfig, VideoInstance, VideoParameters, VideoSourceImage,
};
use crate::poll::poll_until;
use crate::service::GenerationService;
use crate::story::{parse_story, story_user_prompt, STORY_SYSTEM_PROMPT, STORY_TEMPERATURE};
use crate::wav::{pcm_to_wav, SPEECH_SAMPLE_RATE};

/// Resolution requested for every video clip.
const VIDEO_RESOLUTION: &str = "720p";

const VIDEO_MIME: &str = "video/mp4";
const WAV_MIME: &str = "audio/wav";

/// Gemini-backed generation client.
pub struct GeminiClient {
    api: GeminiApi,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let api = GeminiApi::new(config.base_url.clone(), config.api_key.clone());
        Self { api, config }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        let api = GeminiApi::with_client(client, config.base_url.clone(), config.api_key.clone());
        Self { api, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Poll `operation` until it reports done.
    async fn wait_for_operation(&self, operation: Operation) -> Result<Operation, GenerationError> {
        if operation.done {
            return Ok(operation);
        }
        let name = operation.name;
        poll_until(&self.config.video_poll, |attempt| {
            let name = name.as_str();
            async move {
                tracing::debug!(attempt, operation = name, "Polling video job");
                let current = self.api.get_operation(name).await?;
                Ok(current.done.then_some(current))
            }
        })
        .await
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate_story(
        &self,
        topic: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Project, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(story_user_prompt(topic))],
            system_instruction: Some(Content::text(STORY_SYSTEM_PROMPT)),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                temperature: Some(STORY_TEMPERATURE),
                ..Default::default()
            }),
        };

        let response = self
            .api
            .generate_content(&self.config.story_model, &request)
            .await?;
        let text = response.text().ok_or(GenerationError::EmptyPayload("story"))?;
        let project = parse_story(&text, aspect_ratio)?;

        tracing::info!(
            title = %project.title,
            characters = project.characters.len(),
            shots = project.shots.len(),
            "Story generated",
        );
        Ok(project)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<String, GenerationError> {
        let mut parts = Vec::with_capacity(2);

        // The reference portrait goes first; the prompt refers to it as
        // "the first input image".
        if let Some(reference) = &request.reference_image {
            let (mime, payload) = split_data_uri(reference).ok_or_else(|| {
                GenerationError::Media("reference image must be a base64 data URI".to_string())
            })?;
            parts.push(Part::inline(mime, payload));
        }
        parts.push(Part::text(request.compose_prompt()));

        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                seed: i64::try_from(request.seed).ok(),
                image_config: Some(ImageConfig {
                    aspect_ratio: request.aspect_ratio.as_str().to_string(),
                }),
                ..Default::default()
            }),
        };

        let response = self
            .api
            .generate_content(&self.config.image_model, &body)
            .await?;
        let image = response
            .inline_data()
            .ok_or(GenerationError::EmptyPayload("image"))?;

        Ok(data_uri_from_base64(&image.mime_type, &image.data))
    }

    async fn generate_video(&self, request: &VideoRequest) -> Result<String, GenerationError> {
        let (mime, payload) = split_data_uri(&request.source_image).ok_or_else(|| {
            GenerationError::Media("source image must be a base64 data URI".to_string())
        })?;

        let body = PredictVideoRequest {
            instances: vec![VideoInstance {
                prompt: request.motion_prompt(),
                image: VideoSourceImage {
                    bytes_base64_encoded: payload.to_string(),
                    mime_type: mime.to_string(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                resolution: VIDEO_RESOLUTION.to_string(),
                sample_count: 1,
            },
        };

        let started = Instant::now();
        tracing::info!(camera_movement = %request.camera_movement, "Starting video generation");

        let submitted = self
            .api
            .predict_long_running(&self.config.video_model, &body)
            .await?;
        let finished = self.wait_for_operation(submitted).await?;

        if let Some(error) = &finished.error {
            if error.message.contains(ENTITY_NOT_FOUND) {
                return Err(GenerationError::Unauthorized(error.message.clone()));
            }
            return Err(GenerationError::Job(format!("{} (code {})", error.message, error.code)));
        }

        let uri = finished
            .video_uri()
            .ok_or(GenerationError::EmptyPayload("video"))?;
        let bytes = self.api.download(uri).await?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = bytes.len(),
            "Video generated",
        );
        Ok(to_data_uri(VIDEO_MIME, &bytes))
    }

    async fn generate_speech(&self, request: &SpeechRequest) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(request.text.clone())],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(request.voice_id.clone())),
                ..Default::default()
            }),
        };

        let response = self
            .api
            .generate_content(&self.config.tts_model, &body)
            .await?;
        let audio = response
            .inline_data()
            .ok_or(GenerationError::EmptyPayload("audio"))?;

        let pcm = decode_base64(&audio.data)?;
        let rate = sample_rate_from_mime(&audio.mime_type).unwrap_or(SPEECH_SAMPLE_RATE);
        Ok(to_data_uri(WAV_MIME, &pcm_to_wav(&pcm, rate)?))
    }
}

/// Sample rate from a mime type like `audio/L16;codec=pcm;rate=24000`.
fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}
