//! Playback Controller: keeps a media surface in step with the clock.
//!
//! The clock is authoritative. The surface only ever shows the active
//! shot's clip, started when the clock plays and paused when it stops.
//! Swapping clips while playing never touches the clock.

use aniflow_core::types::ShotId;

/// One clip bound to the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBinding {
    pub shot_id: ShotId,
    pub video_url: String,
    pub looped: bool,
    pub muted: bool,
}

impl MediaBinding {
    /// Clips loop and play with sound by default.
    pub fn new(shot_id: ShotId, video_url: impl Into<String>) -> Self {
        Self {
            shot_id,
            video_url: video_url.into(),
            looped: true,
            muted: false,
        }
    }
}

/// Something that can present a video clip.
pub trait MediaSurface: Send + Sync {
    /// Replace the current clip. `None` clears the surface (the shot has
    /// no video, or nothing is active).
    fn bind(&self, media: Option<&MediaBinding>);
    fn play(&self);
    fn pause(&self);
}

/// Surface that only logs what it would do. Used by the headless worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl MediaSurface for LogSurface {
    fn bind(&self, media: Option<&MediaBinding>) {
        match media {
            Some(m) => tracing::debug!(shot_id = m.shot_id, looped = m.looped, "Clip bound"),
            None => tracing::debug!("Surface cleared"),
        }
    }

    fn play(&self) {
        tracing::debug!("Clip playing");
    }

    fn pause(&self) {
        tracing::debug!("Clip paused");
    }
}

pub struct PlaybackController {
    surface: Box<dyn MediaSurface>,
    bound: Option<MediaBinding>,
    playing: bool,
}

impl PlaybackController {
    pub fn new(surface: Box<dyn MediaSurface>) -> Self {
        Self {
            surface,
            bound: None,
            playing: false,
        }
    }

    pub fn bound(&self) -> Option<&MediaBinding> {
        self.bound.as_ref()
    }

    /// Follow a play-state transition of the clock.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        if self.bound.is_none() {
            return;
        }
        if playing {
            self.surface.play();
        } else {
            self.surface.pause();
        }
    }

    /// Show `media` (the active shot's clip, if it has one). Rebinding the
    /// same clip is a no-op so the surface does not restart it.
    pub fn show(&mut self, media: Option<MediaBinding>) {
        if self.bound == media {
            return;
        }
        if self.playing && self.bound.is_some() {
            self.surface.pause();
        }
        self.surface.bind(media.as_ref());
        self.bound = media;
        if self.playing && self.bound.is_some() {
            self.surface.play();
        }
    }
}
