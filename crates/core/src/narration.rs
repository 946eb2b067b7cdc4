//! Fitting a shot's duration to its synthesized narration.

/// Clips at or below this length are treated as unmeasurable noise.
pub const NARRATION_MIN_SECS: f64 = 0.5;

/// Silence kept after the last spoken word.
pub const NARRATION_PADDING_SECS: f64 = 0.5;

/// New duration for a shot whose narration measured `measured_secs`.
///
/// The fitted length is `ceil((measured + padding) * 10) / 10`, i.e. rounded
/// up to the next tenth of a second. A shot is never shortened below its
/// current duration, and measurements at or under [`NARRATION_MIN_SECS`]
/// (or non-finite ones) leave the duration unchanged.
pub fn fit_duration_to_narration(current_secs: f64, measured_secs: f64) -> f64 {
    if !measured_secs.is_finite() || measured_secs <= NARRATION_MIN_SECS {
        return current_secs;
    }
    let fitted = ((measured_secs + NARRATION_PADDING_SECS) * 10.0).ceil() / 10.0;
    fitted.max(current_secs)
}
