//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`StudioEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use aniflow_core::task::{TaskKey, TaskState};
use aniflow_core::types::{ShotId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The whole project graph was swapped (new story, reset).
    ProjectReplaced { title: String },
    ShotChanged { shot_id: ShotId },
    ShotAdded { shot_id: ShotId },
    ShotRemoved { shot_id: ShotId },
    CharacterChanged { name: String },
    SettingsChanged,
    TaskStateChanged { key: TaskKey, state: TaskState },
    BatchStateChanged { in_progress: bool },
    /// The video service rejected the credentials; the user must
    /// re-authenticate before retrying.
    ReauthRequired { message: String },
    PlayStateChanged { playing: bool },
    PlayheadMoved { position: f64 },
    ActiveShotChanged { shot_id: Option<ShotId> },
    TotalDurationChanged { total: f64 },
}

impl EventKind {
    /// Dot-separated event name, e.g. `"shot.changed"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProjectReplaced { .. } => "project.replaced",
            Self::ShotChanged { .. } => "shot.changed",
            Self::ShotAdded { .. } => "shot.added",
            Self::ShotRemoved { .. } => "shot.removed",
            Self::CharacterChanged { .. } => "character.changed",
            Self::SettingsChanged => "settings.changed",
            Self::TaskStateChanged { .. } => "task.state_changed",
            Self::BatchStateChanged { .. } => "batch.state_changed",
            Self::ReauthRequired { .. } => "auth.reauth_required",
            Self::PlayStateChanged { .. } => "timeline.play_state",
            Self::PlayheadMoved { .. } => "timeline.playhead",
            Self::ActiveShotChanged { .. } => "timeline.active_shot",
            Self::TotalDurationChanged { .. } => "timeline.total_duration",
        }
    }

    /// Whether the shot list or its total length (and therefore the
    /// timeline layout) may have changed.
    pub fn affects_timeline(&self) -> bool {
        matches!(
            self,
            Self::ProjectReplaced { .. }
                | Self::ShotChanged { .. }
                | Self::ShotAdded { .. }
                | Self::ShotRemoved { .. }
                | Self::TotalDurationChanged { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// StudioEvent
// ---------------------------------------------------------------------------

/// A timestamped event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioEvent {
    pub kind: EventKind,
    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl StudioEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`StudioEvent`].
///
/// # Usage
///
/// ```rust
/// use aniflow_events::bus::{EventBus, EventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.emit(EventKind::SettingsChanged);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<StudioEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: StudioEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Wrap `kind` in a fresh envelope and publish it.
    pub fn emit(&self, kind: EventKind) {
        self.publish(StudioEvent::new(kind));
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use aniflow_core::task::ArtifactKind;

    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(EventKind::TaskStateChanged {
            key: TaskKey::shot(3, ArtifactKind::Image),
            state: TaskState::Generating,
        });

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.kind.name(), "task.state_changed");
        assert_eq!(
            received.kind,
            EventKind::TaskStateChanged {
                key: TaskKey::shot(3, ArtifactKind::Image),
                state: TaskState::Generating,
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(EventKind::PlayStateChanged { playing: true });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.kind, EventKind::PlayStateChanged { playing: true });
        assert_eq!(e2.kind, EventKind::PlayStateChanged { playing: true });
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers; this must not panic.
        bus.emit(EventKind::SettingsChanged);
    }

    #[test]
    fn only_shot_list_changes_affect_timeline() {
        assert!(EventKind::ShotChanged { shot_id: 1 }.affects_timeline());
        assert!(EventKind::ProjectReplaced {
            title: "x".to_string()
        }
        .affects_timeline());
        assert!(!EventKind::CharacterChanged {
            name: "Aiko".to_string()
        }
        .affects_timeline());
        assert!(EventKind::TotalDurationChanged { total: 4.0 }.affects_timeline());
        assert!(!EventKind::PlayheadMoved { position: 1.0 }.affects_timeline());
        assert!(!EventKind::ActiveShotChanged { shot_id: Some(1) }.affects_timeline());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(EventKind::BatchStateChanged { in_progress: true })
            .expect("serializable");
        assert_eq!(json["type"], "batch_state_changed");
        assert_eq!(json["in_progress"], true);
    }
}
