//! Request payloads handed to the external generation services.
//!
//! Construction is deterministic: the same inputs always yield the same
//! request, which is what lets independent calls stay visually consistent.

use serde::Serialize;

use crate::project::{AspectRatio, CameraAngle, CameraMove, ShotSize};
use crate::types::Seed;

/// Instruction attached when a portrait is passed as identity reference.
pub const REFERENCE_INSTRUCTION: &str = "CRITICAL INSTRUCTION: The first input image is the visual GROUND TRUTH for the character's identity (Hair style, Eye color, Clothes, Face Shape). You MUST retain the identity. HOWEVER, YOU MUST CHANGE THE FACIAL EXPRESSION to match the 'CURRENT FACIAL EXPRESSION' description. Do NOT copy the emotion from the reference image.";

/// Expression line used when the shot names no emotion.
pub const DEFAULT_EXPRESSION: &str = "Dynamic and fitting the scene.";

/// Constraints appended to every image prompt.
pub const NEGATIVE_CONSTRAINTS: &str = "NEGATIVE CONSTRAINTS: Do not change the character's hair color. Do not change the character's clothing. Do not change the background location. Do not morph the face shape. Keep the art style consistent.";

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Everything an image call needs, anchors included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub character_appearance: Option<String>,
    pub style: String,
    pub aspect_ratio: AspectRatio,
    /// Previously generated portrait used as identity ground truth.
    pub reference_image: Option<String>,
    pub seed: Seed,
    pub environment: Option<String>,
    pub shot_size: Option<ShotSize>,
    pub camera_angle: Option<CameraAngle>,
    /// Transient expression that overrides the reference image.
    pub emotion_override: Option<String>,
}

impl ImageRequest {
    /// Render the full text prompt sent alongside the optional reference
    /// image.
    pub fn compose_prompt(&self) -> String {
        let mut sections = vec![format!("Art Style: {}.", self.style)];

        if let Some(lens) = self.lens_line() {
            sections.push(lens);
        }
        if self.reference_image.is_some() {
            sections.push(REFERENCE_INSTRUCTION.to_string());
        }
        if let Some(environment) = &self.environment {
            sections.push(format!("PERMANENT SETTING: {environment}"));
        }
        if let Some(appearance) = &self.character_appearance {
            sections.push(format!("CHARACTER IDENTITY: {appearance}"));
        }
        sections.push(match &self.emotion_override {
            Some(emotion) => format!("CURRENT FACIAL EXPRESSION: {emotion} !!!IMPORTANT!!!"),
            None => format!("CURRENT FACIAL EXPRESSION: {DEFAULT_EXPRESSION}"),
        });
        sections.push(format!("CURRENT SHOT ACTION: {}", self.prompt));
        sections.push(NEGATIVE_CONSTRAINTS.to_string());

        sections.join("\n\n")
    }

    fn lens_line(&self) -> Option<String> {
        let composition = match (&self.shot_size, &self.camera_angle) {
            (None, None) => return None,
            (Some(size), None) => size.to_string(),
            (None, Some(angle)) => angle.to_string(),
            (Some(size), Some(angle)) => format!("{size}, {angle}"),
        };
        Some(format!("CAMERA COMPOSITION: {composition}."))
    }
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRequest {
    pub prompt: String,
    /// Still the clip is animated from. Always present: a video request
    /// cannot be built for a shot without an image.
    pub source_image: String,
    pub aspect_ratio: AspectRatio,
    pub camera_movement: CameraMove,
}

impl VideoRequest {
    /// Prompt with the camera directive folded in.
    pub fn motion_prompt(&self) -> String {
        format!(
            "{}. Cinematic camera movement: {}. High quality, smooth motion.",
            self.prompt, self.camera_movement
        )
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
}
