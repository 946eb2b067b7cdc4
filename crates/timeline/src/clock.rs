//! Timeline Clock: the single authoritative play position.
//!
//! A plain state machine over [`Instant`]s supplied by the caller, so it
//! never reads the wall clock itself. While playing, the position is
//! derived from a virtual start reference (`now - start`); while stopped it
//! is a stored value.

use std::time::Duration;

use tokio::time::Instant;

/// How close to the end a toggle counts as "at the end" and restarts.
pub const RESTART_EPSILON_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
}

/// Result of sampling a playing clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: f64,
    /// The clock reached the end on this sample and stopped itself.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct TimelineClock {
    position: f64,
    total: f64,
    /// Set only while playing.
    virtual_start: Option<Instant>,
}

impl TimelineClock {
    pub fn new(total: f64) -> Self {
        Self {
            position: 0.0,
            total: total.max(0.0),
            virtual_start: None,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn state(&self) -> PlayState {
        if self.virtual_start.is_some() {
            PlayState::Playing
        } else {
            PlayState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.virtual_start.is_some()
    }

    /// Start playing from the current position.
    ///
    /// Returns `false` (and stays stopped) when there is nothing to play or
    /// the clock is already playing. A clock parked at the end restarts
    /// from zero.
    pub fn play(&mut self, now: Instant) -> bool {
        if self.is_playing() || self.total <= 0.0 {
            return false;
        }
        if self.at_end() {
            self.position = 0.0;
        }
        self.virtual_start = Some(rebase(now, self.position));
        true
    }

    /// Stop at the position reached by `now`. Returns `false` if already
    /// stopped.
    pub fn pause(&mut self, now: Instant) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.sample(now);
        self.virtual_start = None;
        true
    }

    /// Flip between playing and stopped, returning the new state.
    pub fn toggle(&mut self, now: Instant) -> PlayState {
        if self.is_playing() {
            self.pause(now);
        } else {
            self.play(now);
        }
        self.state()
    }

    /// Move the playhead to `t`, clamped to `[0, total]`. The play state is
    /// left as it was; a playing clock continues from the new position.
    pub fn seek(&mut self, t: f64, now: Instant) -> f64 {
        self.position = clamp(t, self.total);
        if self.is_playing() {
            self.virtual_start = Some(rebase(now, self.position));
        }
        self.position
    }

    /// Advance a playing clock to `now`. Reaching the end clamps the
    /// position to `total` exactly and stops the clock.
    pub fn sample(&mut self, now: Instant) -> Sample {
        let Some(start) = self.virtual_start else {
            return Sample {
                position: self.position,
                finished: false,
            };
        };

        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        if elapsed >= self.total {
            self.position = self.total;
            self.virtual_start = None;
            return Sample {
                position: self.position,
                finished: true,
            };
        }

        self.position = elapsed;
        Sample {
            position: elapsed,
            finished: false,
        }
    }

    /// Adopt a new total duration. The position is clamped into the new
    /// range, and a playing clock keeps its position across the change.
    pub fn set_total(&mut self, total: f64, now: Instant) {
        if self.is_playing() {
            self.sample(now);
        }
        self.total = total.max(0.0);
        if self.position > self.total {
            self.position = self.total;
        }
        if self.is_playing() {
            if self.total <= 0.0 {
                self.virtual_start = None;
            } else {
                self.virtual_start = Some(rebase(now, self.position));
            }
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.total - RESTART_EPSILON_SECS
    }
}

fn clamp(t: f64, total: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, total)
    }
}

/// The instant playback would have started to be at `position` by `now`.
fn rebase(now: Instant, position: f64) -> Instant {
    let offset = Duration::from_secs_f64(position.max(0.0));
    now.checked_sub(offset).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn starts_stopped_at_zero() {
        let clock = TimelineClock::new(10.0);
        assert_eq!(clock.state(), PlayState::Stopped);
        assert_eq!(clock.position(), 0.0);
    }

    #[test]
    fn playing_position_follows_elapsed_time() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(10.0);
        assert!(clock.play(t0));

        let sample = clock.sample(t0 + secs(2.5));
        assert!((sample.position - 2.5).abs() < 1e-6);
        assert!(!sample.finished);
        assert!(clock.is_playing());
    }

    #[test]
    fn resumes_from_paused_position() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(10.0);
        clock.play(t0);
        clock.pause(t0 + secs(3.0));
        assert!((clock.position() - 3.0).abs() < 1e-6);

        // Time passing while stopped does not move the playhead.
        clock.play(t0 + secs(60.0));
        let sample = clock.sample(t0 + secs(61.0));
        assert!((sample.position - 4.0).abs() < 1e-6);
    }

    #[test]
    fn reaching_the_end_clamps_and_stops() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(5.0);
        clock.play(t0);

        let sample = clock.sample(t0 + secs(7.3));
        assert_eq!(sample.position, 5.0);
        assert!(sample.finished);
        assert_eq!(clock.state(), PlayState::Stopped);
    }

    #[test]
    fn toggle_at_end_restarts_from_zero() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(10.0);
        clock.seek(10.0, t0);

        assert_eq!(clock.toggle(t0), PlayState::Playing);
        assert_eq!(clock.position(), 0.0);
    }

    #[test]
    fn toggle_just_before_end_also_restarts() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(10.0);
        clock.seek(9.95, t0);

        clock.toggle(t0);
        assert_eq!(clock.position(), 0.0);
    }

    #[test]
    fn toggle_mid_timeline_keeps_position() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(10.0);
        clock.seek(4.0, t0);

        clock.toggle(t0);
        assert_eq!(clock.position(), 4.0);
        assert_eq!(clock.toggle(t0 + secs(1.0)), PlayState::Stopped);
        assert!((clock.position() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn seek_clamps_and_preserves_state() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(5.0);

        assert_eq!(clock.seek(-3.0, t0), 0.0);
        assert_eq!(clock.seek(99.0, t0), 5.0);
        assert_eq!(clock.seek(f64::NAN, t0), 0.0);
        assert_eq!(clock.state(), PlayState::Stopped);

        clock.play(t0);
        clock.seek(1.0, t0 + secs(0.5));
        assert!(clock.is_playing());
        let sample = clock.sample(t0 + secs(1.5));
        assert!((sample.position - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_timeline_does_not_play() {
        let mut clock = TimelineClock::new(0.0);
        assert!(!clock.play(Instant::now()));
        assert_eq!(clock.state(), PlayState::Stopped);
    }

    #[test]
    fn growing_total_keeps_playing_position() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(5.0);
        clock.play(t0);

        clock.set_total(5.7, t0 + secs(4.0));
        assert_eq!(clock.total(), 5.7);
        let sample = clock.sample(t0 + secs(5.2));
        assert!(!sample.finished);
        assert!((sample.position - 5.2).abs() < 1e-6);
    }

    #[test]
    fn shrinking_total_clamps_stopped_position() {
        let t0 = Instant::now();
        let mut clock = TimelineClock::new(10.0);
        clock.seek(8.0, t0);

        clock.set_total(6.0, t0);
        assert_eq!(clock.position(), 6.0);
    }
}
