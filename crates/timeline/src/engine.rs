//! The ticking timeline engine.
//!
//! [`Timeline`] owns the [`TimelineClock`], the active-shot selection and the
//! [`PlaybackController`]. Its [`run`](Timeline::run) loop samples the clock
//! at a fixed cadence and follows store events, independently of any
//! generation work running on the same runtime.
//!
//! The shot layout is never cached: every operation reads the current shot
//! list from the store first, so the total duration and the shot under the
//! playhead are always computed from live data.

use std::sync::Arc;
use std::time::Duration;

use aniflow_core::locator::{spans, ShotSpan};
use aniflow_core::types::ShotId;
use aniflow_events::{EventBus, EventKind};
use aniflow_pipeline::ProjectStore;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::{PlayState, TimelineClock};
use crate::controller::{MediaBinding, MediaSurface, PlaybackController};

/// Default sampling cadence while playing.
pub const DEFAULT_TICK_HZ: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Timeline has no shots to play")]
    Empty,

    #[error("Shot {0} not found")]
    ShotNotFound(ShotId),
}

/// Where one shot sits on the timeline and how much of it has played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotProgress {
    pub shot_id: ShotId,
    pub start: f64,
    pub end: f64,
    /// Played fraction in `[0, 1]`.
    pub fraction: f64,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Shot spans read from the store for a single operation.
struct Layout {
    spans: Vec<ShotSpan>,
}

impl Layout {
    fn total(&self) -> f64 {
        self.spans.last().map_or(0.0, |s| s.end)
    }

    fn locate(&self, t: f64) -> Option<ShotId> {
        self.spans.iter().find(|s| s.contains(t)).map(|s| s.shot_id)
    }

    fn span(&self, id: ShotId) -> Option<&ShotSpan> {
        self.spans.iter().find(|s| s.shot_id == id)
    }

    fn first(&self) -> Option<ShotId> {
        self.spans.first().map(|s| s.shot_id)
    }
}

struct State {
    clock: TimelineClock,
    active: Option<ShotId>,
    controller: PlaybackController,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

pub struct Timeline {
    store: Arc<ProjectStore>,
    tick_interval: Duration,
    state: Mutex<State>,
}

impl Timeline {
    /// Create a stopped timeline at position zero with the default 20 Hz
    /// cadence.
    pub fn new(store: Arc<ProjectStore>, surface: Box<dyn MediaSurface>) -> Self {
        Self {
            store,
            tick_interval: tick_interval(DEFAULT_TICK_HZ),
            state: Mutex::new(State {
                clock: TimelineClock::new(0.0),
                active: None,
                controller: PlaybackController::new(surface),
            }),
        }
    }

    /// Override the sampling cadence. Zero is treated as 1 Hz.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_interval = tick_interval(hz);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    fn bus(&self) -> &EventBus {
        self.store.bus()
    }

    // ---- transport ----

    /// Start playing from the current position (from zero when parked at
    /// the end).
    pub async fn play(&self) -> Result<(), TimelineError> {
        let mut state = self.state.lock().await;
        let layout = self.sync(&mut state).await;
        if layout.total() <= 0.0 {
            return Err(TimelineError::Empty);
        }
        self.start(&mut state, &layout).await;
        Ok(())
    }

    pub async fn pause(&self) {
        let mut state = self.state.lock().await;
        self.stop(&mut state);
    }

    /// Play when stopped, pause when playing. Returns the new state.
    pub async fn toggle_play(&self) -> Result<PlayState, TimelineError> {
        let mut state = self.state.lock().await;
        if state.clock.is_playing() {
            self.stop(&mut state);
            return Ok(PlayState::Stopped);
        }
        let layout = self.sync(&mut state).await;
        if layout.total() <= 0.0 {
            return Err(TimelineError::Empty);
        }
        self.start(&mut state, &layout).await;
        Ok(state.clock.state())
    }

    /// Move the playhead to `t` (clamped). The play state is unchanged and
    /// the active shot follows the playhead when a shot owns `t`.
    pub async fn seek(&self, t: f64) -> f64 {
        let mut state = self.state.lock().await;
        let layout = self.sync(&mut state).await;
        let position = state.clock.seek(t, Instant::now());
        self.bus().emit(EventKind::PlayheadMoved { position });
        self.follow_playhead(&mut state, &layout).await;
        position
    }

    /// Select `id` for editing. While playing this jumps the playhead to
    /// the start of the shot so playback and selection stay in step.
    pub async fn select_shot(&self, id: ShotId) -> Result<(), TimelineError> {
        let mut state = self.state.lock().await;
        let layout = self.sync(&mut state).await;
        let start = layout
            .span(id)
            .map(|s| s.start)
            .ok_or(TimelineError::ShotNotFound(id))?;

        if state.clock.is_playing() {
            let position = state.clock.seek(start, Instant::now());
            self.bus().emit(EventKind::PlayheadMoved { position });
        }
        self.set_active(&mut state, Some(id)).await;
        Ok(())
    }

    // ---- observation ----

    pub async fn play_state(&self) -> PlayState {
        let mut state = self.state.lock().await;
        self.advance(&mut state).await;
        state.clock.state()
    }

    /// Current playhead position in seconds.
    pub async fn position(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.advance(&mut state).await;
        state.clock.position()
    }

    /// Sum of shot durations, read from the store.
    pub async fn total_duration(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.sync(&mut state).await.total()
    }

    /// The shot selected for playback or editing.
    pub async fn active_shot(&self) -> Option<ShotId> {
        self.state.lock().await.active
    }

    /// The shot whose interval contains the playhead, if any.
    pub async fn shot_at_playhead(&self) -> Option<ShotId> {
        let mut state = self.state.lock().await;
        let layout = self.advance(&mut state).await;
        layout.locate(state.clock.position())
    }

    /// Per-shot spans with the played fraction at the current position.
    pub async fn progress(&self) -> Vec<ShotProgress> {
        let mut state = self.state.lock().await;
        let layout = self.advance(&mut state).await;
        let t = state.clock.position();
        layout
            .spans
            .iter()
            .map(|s| ShotProgress {
                shot_id: s.shot_id,
                start: s.start,
                end: s.end,
                fraction: s.progress(t),
            })
            .collect()
    }

    /// The clip currently bound to the media surface.
    pub async fn bound_media(&self) -> Option<MediaBinding> {
        self.state.lock().await.controller.bound().cloned()
    }

    // ---- loop ----

    /// Sample the clock once.
    pub async fn tick(&self) {
        let mut state = self.state.lock().await;
        self.advance(&mut state).await;
    }

    /// Run the engine until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut events = self.bus().subscribe();

        self.resync().await;
        tracing::info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            "Timeline started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Timeline shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
                received = events.recv() => match received {
                    Ok(event) if event.kind.affects_timeline() => {
                        self.on_event(&event.kind).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Timeline lagged behind store events");
                        self.resync().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    /// React to one bus event. Events the timeline itself publishes are
    /// ignored.
    pub async fn on_event(&self, kind: &EventKind) {
        match kind {
            EventKind::ProjectReplaced { .. } => {
                let mut state = self.state.lock().await;
                self.stop(&mut state);
                let layout = self.sync(&mut state).await;
                let position = state.clock.seek(0.0, Instant::now());
                self.bus().emit(EventKind::PlayheadMoved { position });
                self.set_active(&mut state, layout.first()).await;
            }
            EventKind::ShotRemoved { shot_id } => {
                let mut state = self.state.lock().await;
                let layout = self.sync(&mut state).await;
                if state.active == Some(*shot_id) {
                    self.set_active(&mut state, layout.first()).await;
                }
                self.follow_if_playing(&mut state, &layout).await;
            }
            EventKind::ShotChanged { shot_id } => {
                let mut state = self.state.lock().await;
                let layout = self.sync(&mut state).await;
                self.follow_if_playing(&mut state, &layout).await;
                if state.active == Some(*shot_id) {
                    // The clip itself may have been generated or replaced.
                    self.refresh_media(&mut state).await;
                }
            }
            EventKind::ShotAdded { .. } | EventKind::TotalDurationChanged { .. } => {
                let mut state = self.state.lock().await;
                let layout = self.sync(&mut state).await;
                self.follow_if_playing(&mut state, &layout).await;
            }
            _ => {}
        }
    }

    // ---- private helpers ----

    /// Re-read everything from the store and select the first shot when
    /// nothing valid is selected.
    async fn resync(&self) {
        let mut state = self.state.lock().await;
        let layout = self.sync(&mut state).await;
        let selection_valid = state.active.is_some_and(|id| layout.span(id).is_some());
        if !selection_valid {
            self.set_active(&mut state, layout.first()).await;
        } else {
            self.refresh_media(&mut state).await;
        }
    }

    /// Read the live layout and bring the clock's total in line with it.
    async fn sync(&self, state: &mut State) -> Layout {
        let layout = self
            .store
            .read(|p| Layout {
                spans: spans(&p.shots).collect(),
            })
            .await;

        let total = layout.total();
        if state.clock.total() != total {
            let was_playing = state.clock.is_playing();
            let before = state.clock.position();
            state.clock.set_total(total, Instant::now());
            tracing::debug!(total, "Timeline length changed");

            if state.clock.position() != before {
                self.bus().emit(EventKind::PlayheadMoved {
                    position: state.clock.position(),
                });
            }
            if was_playing && !state.clock.is_playing() {
                self.bus().emit(EventKind::PlayStateChanged { playing: false });
                state.controller.set_playing(false);
            }
        }
        layout
    }

    /// Sample a playing clock and move the selection with the playhead.
    async fn advance(&self, state: &mut State) -> Layout {
        let layout = self.sync(state).await;
        if !state.clock.is_playing() {
            return layout;
        }

        let sample = state.clock.sample(Instant::now());
        self.bus().emit(EventKind::PlayheadMoved {
            position: sample.position,
        });
        self.follow_playhead(state, &layout).await;

        if sample.finished {
            tracing::debug!(position = sample.position, "Playback reached the end");
            self.bus().emit(EventKind::PlayStateChanged { playing: false });
            state.controller.set_playing(false);
        }
        layout
    }

    async fn start(&self, state: &mut State, layout: &Layout) {
        if !state.clock.play(Instant::now()) {
            return;
        }
        let position = state.clock.position();
        tracing::debug!(position, "Playback started");
        self.bus().emit(EventKind::PlayStateChanged { playing: true });
        self.bus().emit(EventKind::PlayheadMoved { position });
        self.follow_playhead(state, layout).await;
        state.controller.set_playing(true);
    }

    fn stop(&self, state: &mut State) {
        if !state.clock.pause(Instant::now()) {
            return;
        }
        let position = state.clock.position();
        tracing::debug!(position, "Playback paused");
        self.bus().emit(EventKind::PlayStateChanged { playing: false });
        self.bus().emit(EventKind::PlayheadMoved { position });
        state.controller.set_playing(false);
    }

    /// Point the selection at the shot under the playhead. Past the end no
    /// shot owns the playhead and the selection is left alone.
    async fn follow_playhead(&self, state: &mut State, layout: &Layout) {
        if let Some(id) = layout.locate(state.clock.position()) {
            self.set_active(state, Some(id)).await;
        }
    }

    /// Store edits move the selection only during playback. While stopped
    /// the selection belongs to the user.
    async fn follow_if_playing(&self, state: &mut State, layout: &Layout) {
        if state.clock.is_playing() {
            self.follow_playhead(state, layout).await;
        }
    }

    async fn set_active(&self, state: &mut State, id: Option<ShotId>) {
        if state.active == id {
            return;
        }
        state.active = id;
        self.bus().emit(EventKind::ActiveShotChanged { shot_id: id });
        self.refresh_media(state).await;
    }

    async fn refresh_media(&self, state: &mut State) {
        let media = match state.active {
            Some(id) => {
                self.store
                    .read(|p| {
                        p.shot(id)
                            .and_then(|s| s.video_url.clone())
                            .map(|url| MediaBinding::new(id, url))
                    })
                    .await
            }
            None => None,
        };
        state.controller.show(media);
    }
}

fn tick_interval(hz: u32) -> Duration {
    Duration::from_secs(1) / hz.max(1)
}
