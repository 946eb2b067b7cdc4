//! Project graph: settings, characters and the ordered shot list.
//!
//! Field names on the wire follow the story-generation JSON, which mixes
//! snake_case (`location_visuals`, `character_focus`) with a camelCase
//! settings block (`projectSettings.aspectRatio`).

use serde::{Deserialize, Serialize};

use crate::anchor::ConsistencyAnchor;
use crate::error::CoreError;
use crate::task::{ArtifactKind, TaskState};
use crate::types::{Seed, ShotId};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Style applied when the story response carries none.
pub const DEFAULT_GLOBAL_STYLE: &str = "Anime style, high quality";

/// Style of a freshly reset, empty project.
pub const EMPTY_PROJECT_STYLE: &str = "Anime style, high quality, 4k";

/// Title of a freshly reset, empty project.
pub const EMPTY_PROJECT_TITLE: &str = "Untitled Project";

/// Voice used for narration when no focus character resolves.
pub const DEFAULT_VOICE_ID: &str = "Kore";

/// Duration of a manually added shot, in seconds.
pub const DEFAULT_SHOT_DURATION_SECS: f64 = 3.0;

/// Focus value meaning "no character in frame".
pub const NO_FOCUS: &str = "None";

/// Upper bound of the random project seed (exclusive).
const SEED_RANGE: Seed = 1_000_000;

/// Draw a fresh project seed.
pub fn random_seed() -> Seed {
    rand::random_range(0..SEED_RANGE)
}

fn default_global_style() -> String {
    DEFAULT_GLOBAL_STYLE.to_string()
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_shot_duration() -> f64 {
    DEFAULT_SHOT_DURATION_SECS
}

// ---------------------------------------------------------------------------
// Labelled cinematography vocabularies
// ---------------------------------------------------------------------------

/// Define an enum over a fixed label vocabulary that round-trips through
/// plain strings. Unknown labels are preserved in an `Other` variant so a
/// loosely formatted story response still deserializes.
macro_rules! define_label_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident = $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $variant, )+
            /// A label outside the known vocabulary, kept verbatim.
            Other(String),
        }

        impl $name {
            /// The human-readable label sent to generation services.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $label, )+
                    Self::Other(label) => label.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                let known = match value.trim() {
                    $( $label => Some(Self::$variant), )+
                    _ => None,
                };
                known.unwrap_or_else(|| Self::Other(value))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(label) => label,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_label_enum! {
    /// Camera motion applied when animating a still into video.
    CameraMove {
        Static = "Static",
        PanLeft = "Pan Left",
        PanRight = "Pan Right",
        ZoomIn = "Zoom In",
        ZoomOut = "Zoom Out",
        Tracking = "Tracking",
        Shake = "Shake",
    }
}

define_label_enum! {
    /// Framing of the subject.
    ShotSize {
        ExtremeCloseUp = "Extreme Close-up",
        CloseUp = "Close-up",
        Medium = "Medium Shot",
        Cowboy = "Cowboy Shot",
        Wide = "Wide Shot",
    }
}

define_label_enum! {
    /// Vertical camera placement.
    CameraAngle {
        EyeLevel = "Eye Level",
        Low = "Low Angle",
        High = "High Angle",
        Dutch = "Dutch Angle",
        Overhead = "Overhead",
        WormsEye = "Worm's Eye",
    }
}

// ---------------------------------------------------------------------------
// Aspect ratio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    ThreeFour,
    #[serde(rename = "4:3")]
    FourThree,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
            Self::ThreeFour => "3:4",
            Self::FourThree => "4:3",
        }
    }

    /// Parse a `w:h` label.
    pub fn from_label(label: &str) -> Result<Self, CoreError> {
        match label.trim() {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "1:1" => Ok(Self::Square),
            "3:4" => Ok(Self::ThreeFour),
            "4:3" => Ok(Self::FourThree),
            other => Err(CoreError::Validation(format!(
                "Unknown aspect ratio '{other}'. Must be one of: 16:9, 9:16, 1:1, 3:4, 4:3"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Per-project settings. The seed and style are consistency anchors and
/// stay fixed for the lifetime of the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(rename = "aspectRatio", default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default = "default_global_style")]
    pub global_style: String,
    #[serde(default = "random_seed")]
    pub seed: Seed,
    /// Background music asset for the whole sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm_asset_id: Option<String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            global_style: default_global_style(),
            seed: random_seed(),
            bgm_asset_id: None,
        }
    }
}

/// The authoritative project graph.
///
/// `shots` order is timeline order and is never re-sorted implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    /// Static environment description shared by every shot.
    #[serde(rename = "location_visuals", default)]
    pub location_description: String,
    #[serde(rename = "projectSettings", default)]
    pub settings: ProjectSettings,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub shots: Vec<Shot>,
}

impl Project {
    /// A blank project with a fresh seed.
    pub fn empty() -> Self {
        Self {
            title: EMPTY_PROJECT_TITLE.to_string(),
            location_description: String::new(),
            settings: ProjectSettings {
                global_style: EMPTY_PROJECT_STYLE.to_string(),
                ..ProjectSettings::default()
            },
            characters: Vec::new(),
            shots: Vec::new(),
        }
    }

    /// Apply the caller's aspect ratio and fill a missing style, as done
    /// right after a story is generated.
    pub fn normalize(&mut self, aspect_ratio: AspectRatio) {
        self.settings.aspect_ratio = aspect_ratio;
        if self.settings.global_style.trim().is_empty() {
            self.settings.global_style = default_global_style();
        }
    }

    /// Sum of all shot durations, recomputed on every call.
    pub fn total_duration(&self) -> f64 {
        crate::locator::total_duration(&self.shots)
    }

    /// Consistency anchor values for this project.
    pub fn anchor(&self) -> ConsistencyAnchor {
        ConsistencyAnchor {
            seed: self.settings.seed,
            style: self.settings.global_style.clone(),
            environment: self.location_description.clone(),
        }
    }

    pub fn shot(&self, id: ShotId) -> Option<&Shot> {
        self.shots.iter().find(|s| s.id == id)
    }

    pub fn shot_mut(&mut self, id: ShotId) -> Option<&mut Shot> {
        self.shots.iter_mut().find(|s| s.id == id)
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn character_mut(&mut self, name: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.name == name)
    }

    /// Id for a newly appended shot: one past the current maximum.
    pub fn next_shot_id(&self) -> ShotId {
        self.shots.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    /// Check the structural invariants: unique shot ids, unique character
    /// names, positive finite durations.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen_ids = std::collections::HashSet::new();
        for shot in &self.shots {
            if !seen_ids.insert(shot.id) {
                return Err(CoreError::Validation(format!(
                    "duplicate shot id {}",
                    shot.id
                )));
            }
            validate_duration(shot.duration)?;
        }
        let mut seen_names = std::collections::HashSet::new();
        for character in &self.characters {
            if !seen_names.insert(character.name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "duplicate character name '{}'",
                    character.name
                )));
            }
        }
        Ok(())
    }
}

/// A shot duration must be a positive finite number of seconds.
pub fn validate_duration(duration: f64) -> Result<(), CoreError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(CoreError::Validation(format!(
            "shot duration must be a positive number of seconds, got {duration}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub core_traits: String,
    /// Rigid appearance text reused by every shot focusing this character.
    #[serde(default)]
    pub appearance_prompt: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_url: Option<String>,
    #[serde(default)]
    pub portrait_task: TaskState,
}

impl Character {
    pub fn new(name: impl Into<String>, appearance_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            core_traits: String::new(),
            appearance_prompt: appearance_prompt.into(),
            voice_id: default_voice_id(),
            portrait_url: None,
            portrait_task: TaskState::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// Shot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub id: ShotId,
    #[serde(default)]
    pub scene_description: String,
    #[serde(default)]
    pub visual_prompt: String,
    #[serde(default = "default_camera_move")]
    pub camera_movement: CameraMove,
    #[serde(default = "default_camera_angle")]
    pub camera_angle: CameraAngle,
    #[serde(default = "default_shot_size")]
    pub shot_size: ShotSize,
    #[serde(default)]
    pub camera_reasoning: String,
    #[serde(default)]
    pub character_emotion: String,
    #[serde(default)]
    pub dialogue: String,
    /// Character name or `"None"`. Resolved heuristically, see
    /// [`crate::focus::resolve_focus`].
    #[serde(default = "default_focus")]
    pub character_focus: String,
    #[serde(default = "default_shot_duration")]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_effect: Option<String>,
    /// Opaque reference into the asset catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_task: TaskState,
    #[serde(default)]
    pub video_task: TaskState,
    #[serde(default)]
    pub audio_task: TaskState,
}

fn default_camera_move() -> CameraMove {
    CameraMove::Static
}

fn default_camera_angle() -> CameraAngle {
    CameraAngle::EyeLevel
}

fn default_shot_size() -> ShotSize {
    ShotSize::Medium
}

fn default_focus() -> String {
    NO_FOCUS.to_string()
}

impl Shot {
    /// A blank shot as added from the editor.
    pub fn new(id: ShotId) -> Self {
        Self {
            id,
            scene_description: "New Scene".to_string(),
            visual_prompt: "Describe the new shot here...".to_string(),
            camera_movement: default_camera_move(),
            camera_angle: default_camera_angle(),
            shot_size: default_shot_size(),
            camera_reasoning: String::new(),
            character_emotion: "Neutral".to_string(),
            dialogue: String::new(),
            character_focus: default_focus(),
            duration: DEFAULT_SHOT_DURATION_SECS,
            sound_effect: None,
            audio_asset_id: None,
            image_url: None,
            video_url: None,
            audio_url: None,
            image_task: TaskState::Idle,
            video_task: TaskState::Idle,
            audio_task: TaskState::Idle,
        }
    }

    /// Task state for one of the shot's artifact kinds. Portraits belong to
    /// characters, so `Portrait` yields `None`.
    pub fn task_state(&self, kind: ArtifactKind) -> Option<TaskState> {
        match kind {
            ArtifactKind::Image => Some(self.image_task),
            ArtifactKind::Video => Some(self.video_task),
            ArtifactKind::Narration => Some(self.audio_task),
            ArtifactKind::Portrait => None,
        }
    }

    pub fn task_state_mut(&mut self, kind: ArtifactKind) -> Option<&mut TaskState> {
        match kind {
            ArtifactKind::Image => Some(&mut self.image_task),
            ArtifactKind::Video => Some(&mut self.video_task),
            ArtifactKind::Narration => Some(&mut self.audio_task),
            ArtifactKind::Portrait => None,
        }
    }

    /// Whether the shot already carries the artifact of `kind`.
    pub fn has_artifact(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Image => self.image_url.is_some(),
            ArtifactKind::Video => self.video_url.is_some(),
            ArtifactKind::Narration => self.audio_url.is_some(),
            ArtifactKind::Portrait => false,
        }
    }

    /// Slot holding the artifact reference of `kind`.
    pub fn artifact_mut(&mut self, kind: ArtifactKind) -> Option<&mut Option<String>> {
        match kind {
            ArtifactKind::Image => Some(&mut self.image_url),
            ArtifactKind::Video => Some(&mut self.video_url),
            ArtifactKind::Narration => Some(&mut self.audio_url),
            ArtifactKind::Portrait => None,
        }
    }

    pub fn has_dialogue(&self) -> bool {
        !self.dialogue.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const STORY_JSON: &str = r#"{
        "title": "Neon Rain",
        "location_visuals": "A rain-soaked alley lit by pink neon.",
        "projectSettings": { "global_style": "90s Cyberpunk Anime", "bgm_asset_id": "bgm_epic_01" },
        "characters": [
            { "name": "Kaito", "core_traits": "stoic", "appearance_prompt": "silver hair, red scarf", "voice_id": "Puck" }
        ],
        "shots": [
            {
                "id": 1,
                "scene_description": "Kaito waits.",
                "visual_prompt": "Kaito under a flickering sign",
                "camera_movement": "Zoom In",
                "camera_angle": "Low Angle",
                "shot_size": "Close-up",
                "camera_reasoning": "Tension",
                "character_emotion": "Grim",
                "dialogue": "They're late.",
                "character_focus": "Kaito",
                "duration": 3.5,
                "sound_effect": "Rain"
            },
            {
                "id": 2,
                "scene_description": "A drone passes.",
                "visual_prompt": "Drone overhead",
                "camera_movement": "Pan/Zoom",
                "camera_angle": "Overhead",
                "shot_size": "Wide Shot",
                "camera_reasoning": "Scale",
                "character_emotion": "None",
                "dialogue": "",
                "character_focus": "None",
                "duration": 2
            }
        ]
    }"#;

    #[test]
    fn story_json_deserializes() {
        let project: Project = serde_json::from_str(STORY_JSON).unwrap();
        assert_eq!(project.title, "Neon Rain");
        assert_eq!(project.characters.len(), 1);
        assert_eq!(project.shots[0].camera_movement, CameraMove::ZoomIn);
        assert_eq!(project.shots[0].shot_size, ShotSize::CloseUp);
        assert_eq!(project.shots[0].image_task, TaskState::Idle);
        assert_eq!(project.settings.aspect_ratio, AspectRatio::Landscape);
        assert!(project.settings.seed < SEED_RANGE);
    }

    #[test]
    fn unknown_camera_label_is_preserved() {
        let project: Project = serde_json::from_str(STORY_JSON).unwrap();
        assert_eq!(
            project.shots[1].camera_movement,
            CameraMove::Other("Pan/Zoom".to_string())
        );
        assert_eq!(project.shots[1].camera_movement.as_str(), "Pan/Zoom");
    }

    #[test]
    fn labels_serialize_as_plain_strings() {
        let json = serde_json::to_value(Shot::new(7)).unwrap();
        assert_eq!(json["camera_movement"], "Static");
        assert_eq!(json["camera_angle"], "Eye Level");
        assert_eq!(json["shot_size"], "Medium Shot");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn total_duration_sums_shots() {
        let project: Project = serde_json::from_str(STORY_JSON).unwrap();
        assert!((project.total_duration() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn next_shot_id_is_max_plus_one() {
        let mut project = Project::empty();
        assert_eq!(project.next_shot_id(), 1);
        project.shots.push(Shot::new(4));
        project.shots.push(Shot::new(2));
        assert_eq!(project.next_shot_id(), 5);
    }

    #[test]
    fn normalize_fills_blank_style_and_sets_ratio() {
        let mut project: Project = serde_json::from_str(STORY_JSON).unwrap();
        project.settings.global_style = "  ".to_string();
        project.normalize(AspectRatio::Portrait);
        assert_eq!(project.settings.global_style, DEFAULT_GLOBAL_STYLE);
        assert_eq!(project.settings.aspect_ratio, AspectRatio::Portrait);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut project = Project::empty();
        project.shots.push(Shot::new(1));
        project.shots.push(Shot::new(1));
        assert!(project.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_duration() {
        assert!(validate_duration(0.0).is_err());
        assert!(validate_duration(-2.0).is_err());
        assert!(validate_duration(f64::NAN).is_err());
        assert!(validate_duration(0.1).is_ok());
    }

    #[test]
    fn aspect_ratio_labels() {
        assert_eq!(AspectRatio::from_label("9:16").unwrap(), AspectRatio::Portrait);
        assert!(AspectRatio::from_label("21:9").is_err());
        assert_eq!(
            serde_json::to_value(AspectRatio::Square).unwrap(),
            serde_json::json!("1:1")
        );
    }

    #[test]
    fn shot_task_state_excludes_portrait() {
        let shot = Shot::new(1);
        assert_eq!(shot.task_state(ArtifactKind::Portrait), None);
        assert_eq!(shot.task_state(ArtifactKind::Video), Some(TaskState::Idle));
    }
}
