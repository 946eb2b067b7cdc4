//! The Project Store: sole owner of the mutable project graph.
//!
//! Every write is a targeted merge keyed by shot id or character name and
//! reads the state as it is at commit time. Nothing outside the store holds
//! a mutable reference, so a slow task cannot overwrite edits made after it
//! started.
//!
//! Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
//! shared across the application.

use std::sync::Arc;

use aniflow_core::assets::Asset;
use aniflow_core::error::CoreError;
use aniflow_core::project::{validate_duration, AspectRatio, Character, Project, Shot};
use aniflow_core::task::{ArtifactKind, EntityRef, TaskKey, TaskState};
use aniflow_core::types::ShotId;
use aniflow_events::{EventBus, EventKind};
use tokio::sync::RwLock;

/// Errors from store writes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A project must keep at least one shot.
    #[error("Cannot delete the last shot")]
    LastShot,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(CoreError::NotFound { .. }))
    }
}

/// Where an assigned asset ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetTarget {
    Shot(ShotId),
    BackgroundMusic,
}

pub struct ProjectStore {
    project: RwLock<Project>,
    bus: Arc<EventBus>,
}

impl ProjectStore {
    pub fn new(project: Project, bus: Arc<EventBus>) -> Self {
        Self {
            project: RwLock::new(project),
            bus,
        }
    }

    /// A store holding a blank project.
    pub fn empty(bus: Arc<EventBus>) -> Self {
        Self::new(Project::empty(), bus)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    // ---- reads ----

    /// Snapshot of the project as it is right now.
    pub async fn current(&self) -> Project {
        self.project.read().await.clone()
    }

    /// Run `f` against the current project without cloning it.
    pub async fn read<R>(&self, f: impl FnOnce(&Project) -> R) -> R {
        f(&*self.project.read().await)
    }

    pub async fn total_duration(&self) -> f64 {
        self.project.read().await.total_duration()
    }

    pub async fn shots(&self) -> Vec<Shot> {
        self.project.read().await.shots.clone()
    }

    // ---- whole-project writes ----

    /// Swap in a new project graph, e.g. a freshly generated story.
    pub async fn replace(&self, project: Project) -> Result<(), StoreError> {
        project.validate()?;
        let title = project.title.clone();
        let total = project.total_duration();
        *self.project.write().await = project;

        tracing::info!(title = %title, total, "Project replaced");
        self.bus.emit(EventKind::ProjectReplaced { title });
        self.bus.emit(EventKind::TotalDurationChanged { total });
        Ok(())
    }

    /// Discard everything and start over with a blank project and a new
    /// seed.
    pub async fn reset(&self) {
        let project = Project::empty();
        let title = project.title.clone();
        *self.project.write().await = project;

        self.bus.emit(EventKind::ProjectReplaced { title });
        self.bus.emit(EventKind::TotalDurationChanged { total: 0.0 });
    }

    pub async fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) {
        self.project.write().await.settings.aspect_ratio = aspect_ratio;
        self.bus.emit(EventKind::SettingsChanged);
    }

    // ---- shot editing ----

    /// Apply `edit` to the current version of shot `id`.
    ///
    /// The edit runs against a draft; an invalid duration leaves the shot
    /// untouched. The shot id cannot be changed.
    pub async fn update_shot<F>(&self, id: ShotId, edit: F) -> Result<Shot, StoreError>
    where
        F: FnOnce(&mut Shot),
    {
        let (updated, total_changed) = {
            let mut project = self.project.write().await;
            let shot = project.shot_mut(id).ok_or_else(|| shot_not_found(id))?;

            let mut draft = shot.clone();
            edit(&mut draft);
            draft.id = id;
            validate_duration(draft.duration)?;

            let duration_changed = draft.duration != shot.duration;
            *shot = draft.clone();
            (draft, duration_changed.then(|| project.total_duration()))
        };

        self.bus.emit(EventKind::ShotChanged { shot_id: id });
        if let Some(total) = total_changed {
            tracing::debug!(shot_id = id, total, "Total duration changed");
            self.bus.emit(EventKind::TotalDurationChanged { total });
        }
        Ok(updated)
    }

    /// Append a blank shot with the next free id.
    pub async fn add_shot(&self) -> ShotId {
        let (id, total) = {
            let mut project = self.project.write().await;
            let id = project.next_shot_id();
            project.shots.push(Shot::new(id));
            (id, project.total_duration())
        };

        self.bus.emit(EventKind::ShotAdded { shot_id: id });
        self.bus.emit(EventKind::TotalDurationChanged { total });
        id
    }

    /// Remove shot `id`. Returns the id of the first remaining shot, which
    /// is where a selection on the deleted shot should move.
    pub async fn delete_shot(&self, id: ShotId) -> Result<ShotId, StoreError> {
        let (first, total) = {
            let mut project = self.project.write().await;
            if project.shot(id).is_none() {
                return Err(shot_not_found(id).into());
            }
            if project.shots.len() <= 1 {
                return Err(StoreError::LastShot);
            }
            project.shots.retain(|s| s.id != id);
            let first = project.shots.first().map(|s| s.id).ok_or(StoreError::LastShot)?;
            (first, project.total_duration())
        };

        self.bus.emit(EventKind::ShotRemoved { shot_id: id });
        self.bus.emit(EventKind::TotalDurationChanged { total });
        Ok(first)
    }

    /// Attach `asset` to the selected shot's audio slot, or make it the
    /// project's background music when nothing is selected.
    pub async fn assign_asset(
        &self,
        selected: Option<ShotId>,
        asset: &Asset,
    ) -> Result<AssetTarget, StoreError> {
        match selected {
            Some(id) => {
                let asset_id = asset.id.clone();
                self.update_shot(id, |shot| shot.audio_asset_id = Some(asset_id))
                    .await?;
                Ok(AssetTarget::Shot(id))
            }
            None => {
                self.project.write().await.settings.bgm_asset_id = Some(asset.id.clone());
                self.bus.emit(EventKind::SettingsChanged);
                Ok(AssetTarget::BackgroundMusic)
            }
        }
    }

    // ---- character editing ----

    /// Apply `edit` to the current version of character `name`.
    ///
    /// Renaming onto another character's name is rejected.
    pub async fn update_character<F>(&self, name: &str, edit: F) -> Result<Character, StoreError>
    where
        F: FnOnce(&mut Character),
    {
        let updated = {
            let mut project = self.project.write().await;
            let index = project
                .characters
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| character_not_found(name))?;

            let mut draft = project.characters[index].clone();
            edit(&mut draft);

            let clash = project
                .characters
                .iter()
                .enumerate()
                .any(|(i, c)| i != index && c.name == draft.name);
            if clash {
                return Err(CoreError::Validation(format!(
                    "a character named '{}' already exists",
                    draft.name
                ))
                .into());
            }

            project.characters[index] = draft.clone();
            draft
        };

        self.bus.emit(EventKind::CharacterChanged {
            name: updated.name.clone(),
        });
        Ok(updated)
    }

    // ---- task bookkeeping ----

    /// Record a task state transition without touching the artifact.
    pub async fn set_task_state(&self, key: &TaskKey, state: TaskState) -> Result<(), StoreError> {
        self.write_task(key, state, None).await
    }

    /// Store a finished artifact and mark its task `Succeeded` in one write.
    pub async fn commit_artifact(&self, key: &TaskKey, artifact: String) -> Result<(), StoreError> {
        self.write_task(key, TaskState::Succeeded, Some(artifact))
            .await
    }

    async fn write_task(
        &self,
        key: &TaskKey,
        state: TaskState,
        artifact: Option<String>,
    ) -> Result<(), StoreError> {
        let wrote_artifact = artifact.is_some();
        {
            let mut project = self.project.write().await;
            match &key.entity {
                EntityRef::Character(name) => {
                    if key.kind != ArtifactKind::Portrait {
                        return Err(invalid_slot(key).into());
                    }
                    let character = project
                        .character_mut(name)
                        .ok_or_else(|| character_not_found(name))?;
                    character.portrait_task = state;
                    if let Some(url) = artifact {
                        character.portrait_url = Some(url);
                    }
                }
                EntityRef::Shot(id) => {
                    let shot = project.shot_mut(*id).ok_or_else(|| shot_not_found(*id))?;
                    let slot = shot.task_state_mut(key.kind).ok_or_else(|| invalid_slot(key))?;
                    *slot = state;
                    if let Some(url) = artifact {
                        if let Some(target) = shot.artifact_mut(key.kind) {
                            *target = Some(url);
                        }
                    }
                }
            }
        }

        self.bus.emit(EventKind::TaskStateChanged {
            key: key.clone(),
            state,
        });
        if wrote_artifact {
            self.bus.emit(match &key.entity {
                EntityRef::Character(name) => EventKind::CharacterChanged { name: name.clone() },
                EntityRef::Shot(id) => EventKind::ShotChanged { shot_id: *id },
            });
        }
        Ok(())
    }
}

fn shot_not_found(id: ShotId) -> CoreError {
    CoreError::NotFound {
        entity: "shot",
        id: id.to_string(),
    }
}

fn character_not_found(name: &str) -> CoreError {
    CoreError::NotFound {
        entity: "character",
        id: name.to_string(),
    }
}

fn invalid_slot(key: &TaskKey) -> CoreError {
    CoreError::Validation(format!("{key} is not a task slot"))
}
