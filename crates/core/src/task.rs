//! Generation task states and keys.
//!
//! A task is scoped to one (entity, artifact kind) pair: a character owns a
//! single portrait task, a shot owns independent image, video and narration
//! tasks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ShotId;

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Lifecycle of one generation task: `Idle -> Generating -> (Succeeded | Failed)`.
///
/// A terminal state may be re-entered into `Generating` by an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Idle,
    Generating,
    Succeeded,
    Failed,
}

impl TaskState {
    /// `true` once the task has either succeeded or failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact kind
// ---------------------------------------------------------------------------

/// The artifact a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Portrait,
    Image,
    Video,
    Narration,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Image => "image",
            Self::Video => "video",
            Self::Narration => "narration",
        }
    }
}

// ---------------------------------------------------------------------------
// Task key
// ---------------------------------------------------------------------------

/// The entity a task writes into. Characters are keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Character(String),
    Shot(ShotId),
}

/// Identifies exactly one task slot in the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub entity: EntityRef,
    pub kind: ArtifactKind,
}

impl TaskKey {
    pub fn portrait(name: impl Into<String>) -> Self {
        Self {
            entity: EntityRef::Character(name.into()),
            kind: ArtifactKind::Portrait,
        }
    }

    pub fn shot(id: ShotId, kind: ArtifactKind) -> Self {
        Self {
            entity: EntityRef::Shot(id),
            kind,
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            EntityRef::Character(name) => write!(f, "character '{name}' {}", self.kind.as_str()),
            EntityRef::Shot(id) => write!(f, "shot {id} {}", self.kind.as_str()),
        }
    }
}
