//! External asset catalog entries.
//!
//! The catalog itself is owned elsewhere; the core only needs the shape of
//! an entry so shots and project settings can reference one by id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    #[serde(rename = "BGM")]
    Music,
    #[serde(rename = "SFX")]
    SoundEffect,
    #[serde(rename = "OVERLAY")]
    Overlay,
}

/// A read-only catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Asset {
    /// Background music applies to the whole project rather than one shot.
    pub fn is_background_music(&self) -> bool {
        self.kind == AssetKind::Music
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_entry_deserializes() {
        let asset: Asset = serde_json::from_str(
            r#"{"id":"sfx_rain","type":"SFX","name":"Rain","url":"https://cdn.example/rain.mp3","tags":["Weather"]}"#,
        )
        .unwrap();
        assert_eq!(asset.kind, AssetKind::SoundEffect);
        assert!(asset.duration.is_none());
        assert!(!asset.is_background_music());
    }
}
