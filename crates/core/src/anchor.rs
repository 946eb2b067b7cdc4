//! Consistency anchor: per-project values re-injected into every image call.
//!
//! External calls share no memory, so identity and environment are held
//! steady by sending the same seed, style and environment text every time,
//! plus the focus character's appearance text and portrait when one
//! resolves.

use serde::{Deserialize, Serialize};

use crate::project::{AspectRatio, Character, Shot};
use crate::request::ImageRequest;
use crate::types::Seed;

/// Portraits are always square, independent of the project ratio.
pub const PORTRAIT_ASPECT_RATIO: AspectRatio = AspectRatio::Square;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyAnchor {
    pub seed: Seed,
    pub style: String,
    /// Static environment description, never mutated by shots.
    pub environment: String,
}

impl ConsistencyAnchor {
    /// Request for a character's reference portrait.
    ///
    /// Portraits carry no environment, reference image or expression: they
    /// become the reference for everything else.
    pub fn portrait_request(&self, character: &Character) -> ImageRequest {
        ImageRequest {
            prompt: format!(
                "Character portrait of {}, {}, simple background",
                character.name, character.appearance_prompt
            ),
            character_appearance: None,
            style: self.style.clone(),
            aspect_ratio: PORTRAIT_ASPECT_RATIO,
            reference_image: None,
            seed: self.seed,
            environment: None,
            shot_size: None,
            camera_angle: None,
            emotion_override: None,
        }
    }

    /// Request for a shot still.
    ///
    /// When `focus` is `None` the request omits appearance text and the
    /// reference image; the shot is simply un-anchored for identity.
    pub fn shot_request(
        &self,
        shot: &Shot,
        focus: Option<&Character>,
        aspect_ratio: AspectRatio,
    ) -> ImageRequest {
        ImageRequest {
            prompt: shot.visual_prompt.clone(),
            character_appearance: focus
                .map(|c| c.appearance_prompt.clone())
                .filter(|a| !a.trim().is_empty()),
            style: self.style.clone(),
            aspect_ratio,
            reference_image: focus.and_then(|c| c.portrait_url.clone()),
            seed: self.seed,
            environment: non_blank(&self.environment),
            shot_size: Some(shot.shot_size.clone()),
            camera_angle: Some(shot.camera_angle.clone()),
            emotion_override: non_blank(&shot.character_emotion),
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> ConsistencyAnchor {
        ConsistencyAnchor {
            seed: 4242,
            style: "Watercolor anime".to_string(),
            environment: "Misty bamboo forest at dawn".to_string(),
        }
    }

    fn hero() -> Character {
        Character {
            portrait_url: Some("data:image/png;base64,UE9SVFJBSVQ=".to_string()),
            ..Character::new("Mei", "long black braid, green kimono")
        }
    }

    #[test]
    fn portrait_request_is_square_and_unanchored_to_environment() {
        let request = anchor().portrait_request(&hero());
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert_eq!(
            request.prompt,
            "Character portrait of Mei, long black braid, green kimono, simple background"
        );
        assert!(request.environment.is_none());
        assert!(request.reference_image.is_none());
        assert_eq!(request.seed, 4242);
    }

    #[test]
    fn shot_request_carries_character_and_environment_anchors() {
        let mut shot = Shot::new(1);
        shot.visual_prompt = "Mei draws her blade".to_string();
        shot.character_emotion = "Fierce".to_string();
        let character = hero();

        let request = anchor().shot_request(&shot, Some(&character), AspectRatio::Landscape);
        assert_eq!(request.seed, 4242);
        assert_eq!(request.style, "Watercolor anime");
        assert_eq!(
            request.environment.as_deref(),
            Some("Misty bamboo forest at dawn")
        );
        assert_eq!(
            request.character_appearance.as_deref(),
            Some("long black braid, green kimono")
        );
        assert_eq!(request.reference_image, character.portrait_url);
        assert_eq!(request.emotion_override.as_deref(), Some("Fierce"));
    }

    #[test]
    fn shot_request_without_focus_omits_identity() {
        let shot = Shot::new(1);
        let request = anchor().shot_request(&shot, None, AspectRatio::Landscape);
        assert!(request.character_appearance.is_none());
        assert!(request.reference_image.is_none());
        assert!(request.environment.is_some());
    }

    #[test]
    fn same_anchor_yields_identical_seed_and_style() {
        let anchor = anchor();
        let first = anchor.portrait_request(&hero());
        let second = anchor.portrait_request(&hero());
        assert_eq!(first, second);

        let shot_request = anchor.shot_request(&Shot::new(2), Some(&hero()), AspectRatio::Portrait);
        assert_eq!(shot_request.seed, first.seed);
        assert_eq!(shot_request.style, first.style);
    }
}
