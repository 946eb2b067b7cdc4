//! Story prompt and story response parsing.

use std::sync::LazyLock;

use aniflow_core::project::{AspectRatio, Project};
use regex::Regex;

use crate::error::GenerationError;

/// System instruction for the story model.
pub const STORY_SYSTEM_PROMPT: &str = r#"
You are the "StoryDirector" agent of AniFlow, a professional anime production engine.
Your goal is to take a user's short idea and expand it into a concise, visually stunning anime storyboard sequence.

ROLE: EXPERT CINEMATOGRAPHER & ACTING COACH
Apply professional film theory and keep character acting dynamic.
- AVOID STATIC EXPRESSIONS: characters must react to the situation.
- AVOID MISTAKES: do not describe a "Wide Shot" if the visual detail requires seeing tears on a cheek.

Output must be RAW JSON (no markdown formatting) following this structure:
{
  "title": "Scene Title",
  "location_visuals": "A detailed, STATIC description of the environment that DOES NOT CHANGE. Lighting, colors, background objects, weather. No characters.",
  "projectSettings": {
    "global_style": "90s Cyberpunk Anime Style, High Contrast, Neon Lighting",
    "bgm_asset_id": "bgm_epic_01"
  },
  "characters": [
    {
      "name": "Character Name",
      "core_traits": "visual traits list",
      "appearance_prompt": "highly detailed visual description focusing on hair, eyes, clothing AND SPECIFIC HELD ITEMS OR WEAPONS. This description must be rigid.",
      "voice_id": "Puck"
    }
  ],
  "shots": [
    {
      "id": 1,
      "scene_description": "Narrative description of what happens",
      "visual_prompt": "English visual description for image generation. DESCRIBE THE ACTION VIVIDLY.",
      "camera_movement": "Pan/Zoom/Static/Tracking/Shake",
      "camera_angle": "Low Angle/High Angle/Eye Level/Dutch Angle/Overhead",
      "shot_size": "Close-up/Medium Shot/Wide Shot/Extreme Close-up/Cowboy Shot",
      "camera_reasoning": "Brief explanation of WHY this angle/size was chosen.",
      "character_emotion": "Specific emotion instructions, e.g. 'Smug grin'. Avoid 'Neutral' unless necessary.",
      "dialogue": "Character dialogue line",
      "character_focus": "Name of character in shot (must match character list name exactly) or 'None'",
      "duration": 3.5,
      "sound_effect": "Rain/Explosion/Silence"
    }
  ]
}

Rules:
1. GENERATE EXACTLY 5 SHOTS forming a mini-arc (Start -> Conflict -> Climax -> Resolution).
2. Every shot MUST have a distinct 'character_emotion'.
3. Visual prompts should include lighting and atmosphere keywords.
4. Action-heavy scenes use dynamic angles (Dutch Angle, Fisheye).
5. Character names in 'shots' must match the 'characters' list exactly.
6. voice_id must be one of: 'Puck', 'Charon', 'Kore', 'Fenrir', 'Zephyr'.
7. CHARACTER CONSISTENCY: describe outfit and handheld props in extreme detail in 'appearance_prompt'.
8. ENVIRONMENT CONSISTENCY: 'location_visuals' must be detailed enough to reuse for every shot.
"#;

/// Sampling temperature for story generation.
pub const STORY_TEMPERATURE: f32 = 0.7;

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?|\n?```").expect("valid regex"));

/// User turn sent to the story model.
pub fn story_user_prompt(topic: &str) -> String {
    format!(
        "Create a professional anime script based on this idea: \"{topic}\". Make sure to generate exactly 5 distinct shots that tell a mini-story with dynamic character acting."
    )
}

/// Remove markdown code fences the model sometimes wraps around JSON.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_RE.replace_all(text, "").trim().to_string()
}

/// Parse the story model's JSON into a validated project.
///
/// The caller's aspect ratio replaces whatever the model chose, and an
/// absent style falls back to the default.
pub fn parse_story(text: &str, aspect_ratio: AspectRatio) -> Result<Project, GenerationError> {
    let cleaned = strip_code_fences(text);
    let mut project: Project = serde_json::from_str(&cleaned)
        .map_err(|e| GenerationError::Parse(format!("story JSON: {e}")))?;

    project.normalize(aspect_ratio);
    project
        .validate()
        .map_err(|e| GenerationError::Parse(e.to_string()))?;

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {} "), "{}");
    }

    #[test]
    fn user_prompt_quotes_topic() {
        assert!(story_user_prompt("a fox spirit").contains("\"a fox spirit\""));
    }
}
