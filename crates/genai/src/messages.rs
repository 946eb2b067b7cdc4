//! Wire types for the Gemini REST endpoints.
//!
//! Only the fields this crate reads or writes are modelled; everything
//! else in a response is ignored during deserialization.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// generateContent request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

/// Base64 payload with its mime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl SpeechConfig {
    pub fn prebuilt(voice_name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.into(),
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// generateContent response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// First inline payload of the first candidate, if any.
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Long-running video operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PredictVideoRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoInstance {
    pub prompt: String,
    pub image: VideoSourceImage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSourceImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub aspect_ratio: String,
    pub resolution: String,
    pub sample_count: u32,
}

/// A long-running operation handle, as returned on submit and on poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<VideoOperationResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GeneratedVideos>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVideos {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSample {
    pub video: VideoFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoFile {
    pub uri: String,
}

impl Operation {
    /// Download URI of the first generated video, if the job produced one.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()
            .map(|s| s.video.uri.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::inline("image/png", "AAAA"), Part::text("hi")],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                seed: Some(42),
                image_config: Some(ImageConfig {
                    aspect_ratio: "16:9".to_string(),
                }),
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "hi");
        assert_eq!(json["generationConfig"]["seed"], 42);
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert!(json.get("systemInstruction").is_none());
        assert!(json["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn response_extracts_text_and_inline_data() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "{\"a\":" },
                    { "text": "1}" },
                    { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));
        assert_eq!(response.inline_data().unwrap().mime_type, "image/png");
    }

    #[test]
    fn empty_response_has_nothing() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.text().is_none());
        assert!(response.inline_data().is_none());
    }

    #[test]
    fn finished_operation_yields_video_uri() {
        let op: Operation = serde_json::from_value(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://files.example/v.mp4?alt=media" } }
            ]}}
        }))
        .unwrap();
        assert_eq!(op.video_uri(), Some("https://files.example/v.mp4?alt=media"));
    }

    #[test]
    fn pending_operation_defaults() {
        let op: Operation =
            serde_json::from_value(serde_json::json!({ "name": "operations/abc" })).unwrap();
        assert!(!op.done);
        assert!(op.video_uri().is_none());
    }
}
