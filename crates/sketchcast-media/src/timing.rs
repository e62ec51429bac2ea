//! Per-clip timing: floor, draw phase and trailing hold.

use serde::{Deserialize, Serialize};
use sketchcast_models::{DriftPolicy, HoldMode, RenderSettings};

/// Tolerance when converting seconds to whole frames.
const FRAME_EPSILON: f64 = 1e-6;

/// Timing of one reveal clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipTiming {
    /// Measured narration duration this clip pairs with
    pub audio_secs: f64,
    /// Duration of the rendered clip
    pub total_secs: f64,
    /// Time spent revealing strokes
    pub draw_secs: f64,
    /// Time spent on the completed drawing
    pub hold_secs: f64,
}

impl ClipTiming {
    /// Plan the clip for a narration of `audio_secs`.
    ///
    /// Under [`DriftPolicy::Global`] the clip lasts `max(d, min_clip_secs)`.
    /// Under [`DriftPolicy::PerClip`] it lasts exactly `d` and the hold is
    /// always contained, so the clip never drifts from its narration.
    pub fn plan(audio_secs: f64, settings: &RenderSettings) -> Self {
        let audio_secs = if audio_secs.is_finite() {
            audio_secs.max(0.0)
        } else {
            0.0
        };
        let hold = settings.hold_secs.max(0.0);

        let (base, mode) = match settings.drift_policy {
            DriftPolicy::Global => (audio_secs.max(settings.min_clip_secs), settings.hold_mode),
            DriftPolicy::PerClip => (audio_secs, HoldMode::Contained),
        };

        match mode {
            HoldMode::Contained => {
                let draw_secs = (base - hold).max(0.0);
                Self {
                    audio_secs,
                    total_secs: base,
                    draw_secs,
                    hold_secs: base - draw_secs,
                }
            }
            HoldMode::Additive => Self {
                audio_secs,
                total_secs: base + hold,
                draw_secs: base,
                hold_secs: hold,
            },
        }
    }

    /// Whole frames covering the clip; at least one.
    pub fn total_frames(&self, fps: u32) -> u64 {
        secs_to_frames(self.total_secs, fps).max(1)
    }

    /// Frames spent drawing; the remainder of `total_frames` is hold.
    pub fn draw_frames(&self, fps: u32) -> u64 {
        secs_to_frames(self.draw_secs, fps).min(self.total_frames(fps))
    }

    /// Duration of the encoded clip after frame quantization.
    pub fn encoded_secs(&self, fps: u32) -> f64 {
        self.total_frames(fps) as f64 / fps.max(1) as f64
    }

    /// How far the clip overshoots its narration.
    pub fn drift_secs(&self) -> f64 {
        self.total_secs - self.audio_secs
    }
}

fn secs_to_frames(secs: f64, fps: u32) -> u64 {
    (secs * fps as f64 - FRAME_EPSILON).ceil().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(policy: DriftPolicy, mode: HoldMode) -> RenderSettings {
        RenderSettings::default()
            .with_drift_policy(policy)
            .with_hold(mode, 0.5)
    }

    #[test]
    fn test_short_narration_is_floored() {
        let timing = ClipTiming::plan(0.3, &RenderSettings::default());
        assert_eq!(timing.total_secs, 1.0);
        assert_eq!(timing.draw_secs, 0.5);
        assert_eq!(timing.hold_secs, 0.5);
        assert!((timing.drift_secs() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_contained_hold_fits_inside_duration() {
        let timing = ClipTiming::plan(2.0, &settings(DriftPolicy::Global, HoldMode::Contained));
        assert_eq!(timing.total_secs, 2.0);
        assert_eq!(timing.draw_secs, 1.5);
        assert_eq!(timing.total_frames(24), 48);
        assert_eq!(timing.draw_frames(24), 36);
    }

    #[test]
    fn test_additive_hold_overshoots() {
        let timing = ClipTiming::plan(1.5, &settings(DriftPolicy::Global, HoldMode::Additive));
        assert_eq!(timing.draw_secs, 1.5);
        assert_eq!(timing.total_secs, 2.0);
        assert_eq!(timing.drift_secs(), 0.5);
    }

    #[test]
    fn test_per_clip_overrides_floor() {
        let timing = ClipTiming::plan(0.3, &settings(DriftPolicy::PerClip, HoldMode::Additive));
        assert_eq!(timing.total_secs, 0.3);
        assert_eq!(timing.draw_secs, 0.0);
        assert_eq!(timing.hold_secs, 0.3);
        assert_eq!(timing.drift_secs(), 0.0);
    }

    #[test]
    fn test_frames_never_undershoot() {
        let timing = ClipTiming::plan(2.37, &RenderSettings::default());
        assert_eq!(timing.total_frames(24), 57);
        assert!(timing.encoded_secs(24) >= 2.37);

        let zero = ClipTiming::plan(0.0, &settings(DriftPolicy::PerClip, HoldMode::Contained));
        assert_eq!(zero.total_frames(24), 1);
    }

    #[test]
    fn test_non_finite_audio_is_clamped() {
        let timing = ClipTiming::plan(f64::NAN, &RenderSettings::default());
        assert_eq!(timing.audio_secs, 0.0);
        assert_eq!(timing.total_secs, 1.0);
    }
}
