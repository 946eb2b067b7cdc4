//! Shot Locator: maps a timeline position to the shot that owns it.
//!
//! Each shot owns the half-open interval `[start, start + duration)` where
//! `start` is the sum of the durations before it. The end of the timeline
//! (`t == total`) belongs to no shot.

use crate::project::Shot;
use crate::types::ShotId;

/// Sum of all shot durations.
pub fn total_duration(shots: &[Shot]) -> f64 {
    shots.iter().map(|s| s.duration).sum()
}

/// Id of the shot whose interval contains `t`, or `None` when `t` is outside
/// every interval (negative, at or past the end, or an empty list).
pub fn locate(t: f64, shots: &[Shot]) -> Option<ShotId> {
    spans(shots)
        .find(|span| span.contains(t))
        .map(|span| span.shot_id)
}

/// Position of one shot on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotSpan {
    pub shot_id: ShotId,
    pub start: f64,
    pub end: f64,
}

impl ShotSpan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// Fraction of this shot already played at `t`, in `[0, 1]`.
    pub fn progress(&self, t: f64) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 || t <= self.start {
            0.0
        } else if t >= self.end {
            1.0
        } else {
            (t - self.start) / duration
        }
    }
}

/// Walk the shots in timeline order, yielding each one's span.
pub fn spans(shots: &[Shot]) -> impl Iterator<Item = ShotSpan> + '_ {
    shots.iter().scan(0.0_f64, |elapsed, shot| {
        let start = *elapsed;
        *elapsed += shot.duration;
        Some(ShotSpan {
            shot_id: shot.id,
            start,
            end: *elapsed,
        })
    })
}

/// Start time of `shot_id`, if present.
pub fn start_of(shot_id: ShotId, shots: &[Shot]) -> Option<f64> {
    spans(shots)
        .find(|span| span.shot_id == shot_id)
        .map(|span| span.start)
}
