//! Wires the store, pipeline and timeline into one headless studio.

use std::sync::Arc;

use aniflow_events::{EventBus, EventKind, StudioEvent};
use aniflow_genai::{GenerationService, MediaProbe, WavProbe};
use aniflow_pipeline::{
    BatchReport, GenerationTasks, LogReauth, Pacing, PipelineOrchestrator, ProjectStore,
    ReauthPrompt,
};
use aniflow_timeline::{LogSurface, MediaSurface, PlayState, Timeline};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// What one production run made.
#[derive(Debug)]
pub struct ProductionSummary {
    pub title: String,
    pub shots: usize,
    pub images: BatchReport,
    pub narration: Option<BatchReport>,
    pub total_duration: f64,
}

pub struct Studio {
    pub bus: Arc<EventBus>,
    pub store: Arc<ProjectStore>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub timeline: Arc<Timeline>,
    service: Arc<dyn GenerationService>,
}

impl Studio {
    /// Studio with the WAV probe, log-only re-authentication and a
    /// log-only media surface.
    pub fn new(service: Arc<dyn GenerationService>, config: &WorkerConfig) -> Self {
        Self::with_collaborators(
            service,
            Arc::new(WavProbe),
            Arc::new(LogReauth),
            Box::new(LogSurface),
            config,
        )
    }

    pub fn with_collaborators(
        service: Arc<dyn GenerationService>,
        probe: Arc<dyn MediaProbe>,
        reauth: Arc<dyn ReauthPrompt>,
        surface: Box<dyn MediaSurface>,
        config: &WorkerConfig,
    ) -> Self {
        let bus = Arc::new(EventBus::default());
        let store = Arc::new(ProjectStore::empty(Arc::clone(&bus)));
        let tasks = Arc::new(GenerationTasks::new(
            Arc::clone(&store),
            Arc::clone(&service),
            probe,
            reauth,
        ));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            tasks,
            Pacing::new(config.pacing),
        ));
        let timeline = Arc::new(
            Timeline::new(Arc::clone(&store), surface).with_tick_rate(config.tick_hz),
        );
        Self {
            bus,
            store,
            orchestrator,
            timeline,
            service,
        }
    }

    /// Generate a story for the configured topic, then portraits, shot
    /// images and (optionally) narration.
    pub async fn produce(&self, config: &WorkerConfig) -> anyhow::Result<ProductionSummary> {
        tracing::info!(topic = %config.topic, aspect_ratio = config.aspect_ratio.as_str(), "Generating story");
        let mut project = self
            .service
            .generate_story(&config.topic, config.aspect_ratio)
            .await?;
        if let Some(seed) = config.seed {
            project.settings.seed = seed;
        }
        let title = project.title.clone();
        let shots = project.shots.len();
        self.store.replace(project).await?;

        let images = self.orchestrator.run_full().await?;
        let narration = if config.narration {
            Some(self.orchestrator.batch_missing_narration().await?)
        } else {
            None
        };

        Ok(ProductionSummary {
            title,
            shots,
            images,
            narration,
            total_duration: self.store.total_duration().await,
        })
    }

    /// Play the timeline from the start and wait until it stops.
    pub async fn play_through(&self) -> anyhow::Result<()> {
        let mut events = self.bus.subscribe();
        self.timeline.seek(0.0).await;
        self.timeline.play().await?;

        loop {
            match events.recv().await {
                Ok(event) if event.kind == (EventKind::PlayStateChanged { playing: false }) => {
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    // The stop notification may be among the dropped events.
                    tracing::warn!(missed, "Playback watcher lagged");
                    if self.timeline.play_state().await == PlayState::Stopped {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        let position = self.timeline.position().await;
        tracing::info!(position, "Playback finished");
        Ok(())
    }
}

/// Log every event on the bus until cancelled or the bus closes.
pub async fn log_events(mut rx: broadcast::Receiver<StudioEvent>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(event) => log_event(&event.kind),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event logger lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn log_event(kind: &EventKind) {
    match kind {
        EventKind::PlayheadMoved { position } => {
            tracing::trace!(event = kind.name(), position, "Event");
        }
        EventKind::ReauthRequired { message } => {
            tracing::warn!(event = kind.name(), reason = %message, "Event");
        }
        EventKind::TaskStateChanged { key, state } => {
            tracing::debug!(event = kind.name(), task = %key, state = state.as_str(), "Event");
        }
        _ => tracing::debug!(event = kind.name(), ?kind, "Event"),
    }
}
