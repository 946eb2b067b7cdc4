//! Timeline Clock, Shot Locator integration and the Playback Controller.
//!
//! - [`clock::TimelineClock`] is the pure play/pause/seek state machine.
//! - [`engine::Timeline`] samples it at a fixed cadence, follows the
//!   project store and publishes playhead, play-state and active-shot
//!   changes.
//! - [`controller::PlaybackController`] keeps a [`controller::MediaSurface`]
//!   showing the active shot's clip.

pub mod clock;
pub mod controller;
pub mod engine;

pub use clock::{PlayState, TimelineClock};
pub use controller::{LogSurface, MediaBinding, MediaSurface, PlaybackController};
pub use engine::{ShotProgress, Timeline, TimelineError, DEFAULT_TICK_HZ};
