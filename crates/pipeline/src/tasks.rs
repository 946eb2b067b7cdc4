//! Generation Tasks: one external call producing one artifact for one
//! entity.
//!
//! Each task reads the current store state when it builds its request,
//! marks its slot `Generating`, calls the service, then commits either the
//! artifact (`Succeeded`) or nothing but the state (`Failed`). Transient
//! failures are absorbed here and reported as [`TaskOutcome::Failed`];
//! only precondition and lookup problems come back as [`TaskError`], and
//! those are raised before any external call is made.

use std::sync::Arc;

use aniflow_core::focus::resolve_focus;
use aniflow_core::narration::fit_duration_to_narration;
use aniflow_core::project::DEFAULT_VOICE_ID;
use aniflow_core::request::{SpeechRequest, VideoRequest};
use aniflow_core::task::{ArtifactKind, TaskKey, TaskState};
use aniflow_core::types::ShotId;
use aniflow_events::EventKind;
use aniflow_genai::{GenerationError, GenerationService, MediaProbe};

use crate::reauth::ReauthPrompt;
use crate::store::{ProjectStore, StoreError};

/// How a task that actually ran ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Succeeded,
    /// The external call failed. The slot is `Failed` and no artifact was
    /// written.
    Failed { reason: String },
    /// The service rejected the credentials. Like `Failed`, plus the user
    /// has been asked to re-authenticate.
    ReauthRequired { message: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// A task that was refused before any external call.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{key}: {source}")]
    NotFound {
        key: TaskKey,
        #[source]
        source: StoreError,
    },

    #[error("{key}: {reason}")]
    Precondition { key: TaskKey, reason: String },
}

impl TaskError {
    pub fn key(&self) -> &TaskKey {
        match self {
            Self::NotFound { key, .. } | Self::Precondition { key, .. } => key,
        }
    }
}

/// Runs individual generation tasks against the store.
pub struct GenerationTasks {
    store: Arc<ProjectStore>,
    service: Arc<dyn GenerationService>,
    probe: Arc<dyn MediaProbe>,
    reauth: Arc<dyn ReauthPrompt>,
}

impl GenerationTasks {
    pub fn new(
        store: Arc<ProjectStore>,
        service: Arc<dyn GenerationService>,
        probe: Arc<dyn MediaProbe>,
        reauth: Arc<dyn ReauthPrompt>,
    ) -> Self {
        Self {
            store,
            service,
            probe,
            reauth,
        }
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    /// Generate the reference portrait for character `name`.
    pub async fn generate_portrait(&self, name: &str) -> Result<TaskOutcome, TaskError> {
        let key = TaskKey::portrait(name);
        let request = self
            .store
            .read(|p| p.character(name).map(|c| p.anchor().portrait_request(c)))
            .await
            .ok_or_else(|| not_found(&key, "character", name))?;

        let result = self.call(&key, self.service.generate_image(&request)).await;
        Ok(self.finish(&key, result).await)
    }

    /// Generate the still for shot `id`, anchored on the focus character
    /// when one resolves.
    pub async fn generate_shot_image(&self, id: ShotId) -> Result<TaskOutcome, TaskError> {
        let key = TaskKey::shot(id, ArtifactKind::Image);
        let request = self
            .store
            .read(|p| {
                p.shot(id).map(|shot| {
                    let focus = resolve_focus(&shot.character_focus, &p.characters);
                    p.anchor()
                        .shot_request(shot, focus, p.settings.aspect_ratio)
                })
            })
            .await
            .ok_or_else(|| not_found(&key, "shot", &id.to_string()))?;

        if request.reference_image.is_none() && request.character_appearance.is_some() {
            tracing::debug!(shot_id = id, "Focus character has no portrait yet");
        }

        let result = self.call(&key, self.service.generate_image(&request)).await;
        Ok(self.finish(&key, result).await)
    }

    /// Animate the existing still of shot `id`.
    ///
    /// A shot without an image is refused immediately: no external call,
    /// no state change.
    pub async fn generate_video(&self, id: ShotId) -> Result<TaskOutcome, TaskError> {
        let key = TaskKey::shot(id, ArtifactKind::Video);
        let request = self
            .store
            .read(|p| {
                p.shot(id).map(|shot| {
                    shot.image_url.clone().map(|source_image| VideoRequest {
                        prompt: shot.visual_prompt.clone(),
                        source_image,
                        aspect_ratio: p.settings.aspect_ratio,
                        camera_movement: shot.camera_movement.clone(),
                    })
                })
            })
            .await
            .ok_or_else(|| not_found(&key, "shot", &id.to_string()))?
            .ok_or_else(|| TaskError::Precondition {
                key: key.clone(),
                reason: "generate an image first".to_string(),
            })?;

        let result = self.call(&key, self.service.generate_video(&request)).await;
        Ok(self.finish(&key, result).await)
    }

    /// Synthesize the dialogue of shot `id`, then stretch the shot so it
    /// does not end before the line does.
    pub async fn generate_narration(&self, id: ShotId) -> Result<TaskOutcome, TaskError> {
        let key = TaskKey::shot(id, ArtifactKind::Narration);
        let request = self
            .store
            .read(|p| {
                p.shot(id).map(|shot| {
                    let voice_id = resolve_focus(&shot.character_focus, &p.characters)
                        .map(|c| c.voice_id.clone())
                        .filter(|v| !v.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());
                    shot.has_dialogue().then(|| SpeechRequest {
                        text: shot.dialogue.clone(),
                        voice_id,
                    })
                })
            })
            .await
            .ok_or_else(|| not_found(&key, "shot", &id.to_string()))?
            .ok_or_else(|| TaskError::Precondition {
                key: key.clone(),
                reason: "shot has no dialogue".to_string(),
            })?;

        let result = self.call(&key, self.service.generate_speech(&request)).await;
        let audio = result.as_ref().ok().cloned();
        let outcome = self.finish(&key, result).await;

        if let (TaskOutcome::Succeeded, Some(audio)) = (&outcome, audio) {
            self.fit_duration(id, &audio).await;
        }
        Ok(outcome)
    }

    // ---- private helpers ----

    /// Mark `key` as generating, then await the external call.
    async fn call<F>(&self, key: &TaskKey, request: F) -> Result<String, GenerationError>
    where
        F: std::future::Future<Output = Result<String, GenerationError>>,
    {
        if let Err(e) = self.store.set_task_state(key, TaskState::Generating).await {
            tracing::warn!(task = %key, error = %e, "Could not mark task as generating");
        }
        tracing::info!(task = %key, "Generation started");
        request.await
    }

    /// Commit the call's result to the store and classify it.
    async fn finish(&self, key: &TaskKey, result: Result<String, GenerationError>) -> TaskOutcome {
        match result {
            Ok(artifact) => match self.store.commit_artifact(key, artifact).await {
                Ok(()) => {
                    tracing::info!(task = %key, "Generation succeeded");
                    TaskOutcome::Succeeded
                }
                Err(e) => {
                    // The entity disappeared while the call was in flight.
                    tracing::warn!(task = %key, error = %e, "Discarding generated artifact");
                    TaskOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                self.mark_failed(key).await;
                if e.is_authorization() {
                    let message = e.to_string();
                    tracing::warn!(task = %key, error = %e, "Re-authentication required");
                    self.reauth.request_reauth(&message);
                    self.store.bus().emit(EventKind::ReauthRequired {
                        message: message.clone(),
                    });
                    TaskOutcome::ReauthRequired { message }
                } else {
                    tracing::warn!(task = %key, error = %e, "Generation failed");
                    TaskOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }
    }

    async fn mark_failed(&self, key: &TaskKey) {
        if let Err(e) = self.store.set_task_state(key, TaskState::Failed).await {
            tracing::warn!(task = %key, error = %e, "Could not mark task as failed");
        }
    }

    async fn fit_duration(&self, id: ShotId, audio: &str) {
        let measured = match self.probe.duration_secs(audio).await {
            Ok(secs) => secs,
            Err(e) => {
                tracing::warn!(shot_id = id, error = %e, "Could not measure narration");
                return;
            }
        };

        match self
            .store
            .update_shot(id, |shot| {
                shot.duration = fit_duration_to_narration(shot.duration, measured);
            })
            .await
        {
            Ok(shot) => {
                tracing::info!(shot_id = id, measured, duration = shot.duration, "Fitted shot to narration");
            }
            Err(e) => {
                tracing::warn!(shot_id = id, error = %e, "Could not fit shot duration");
            }
        }
    }
}

fn not_found(key: &TaskKey, entity: &'static str, id: &str) -> TaskError {
    TaskError::NotFound {
        key: key.clone(),
        source: StoreError::Core(aniflow_core::error::CoreError::NotFound {
            entity,
            id: id.to_string(),
        }),
    }
}
