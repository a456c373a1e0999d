//! Duration normalization rules for special media slots.
//!
//! Slot 0 is the "hook" clip: when cutting is enabled, its centered 9 second
//! window is played back in 5 seconds. Slot 1 is usually a long demo clip and
//! is sped up to fit a cap. Narration is then time-boxed against the
//! resulting visual runtime.

use serde::{Deserialize, Serialize};

use promo_models::MediaItem;

pub const HERO_WINDOW_SECS: f64 = 9.0;
pub const HERO_PLAYBACK_SECS: f64 = 5.0;
/// Slot 1 is compressed to exactly this length when longer.
pub const SECOND_CLIP_CAP_SECS: f64 = 31.9;
/// Slot 1 contribution cap when sizing the narration.
pub const SECOND_CLIP_BODY_CAP_SECS: f64 = 38.9;
/// Narration ends this much before the body.
pub const NARRATION_TAIL_OFFSET_SECS: f64 = 0.1;
/// Hard ceiling for the narration track.
pub const NARRATION_CEILING_SECS: f64 = 44.8;
/// Only the head of the outro clip is used.
pub const OUTRO_SECS: f64 = 3.0;

/// Timing tunables.
///
/// The second-clip caps differ on purpose: visuals are compressed to
/// `second_clip_cap_secs`, while the narration budget counts slot 1 up to
/// `second_clip_body_cap_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPolicy {
    pub hero_window_secs: f64,
    pub hero_playback_secs: f64,
    pub second_clip_cap_secs: f64,
    pub second_clip_body_cap_secs: f64,
    pub narration_tail_offset_secs: f64,
    pub narration_ceiling_secs: f64,
    pub outro_secs: f64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            hero_window_secs: HERO_WINDOW_SECS,
            hero_playback_secs: HERO_PLAYBACK_SECS,
            second_clip_cap_secs: SECOND_CLIP_CAP_SECS,
            second_clip_body_cap_secs: SECOND_CLIP_BODY_CAP_SECS,
            narration_tail_offset_secs: NARRATION_TAIL_OFFSET_SECS,
            narration_ceiling_secs: NARRATION_CEILING_SECS,
            outro_secs: OUTRO_SECS,
        }
    }
}

/// Timing treatment of one clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipTiming {
    /// Only scaled to the canvas
    Passthrough,
    /// Trim to `[start, end]`, reset timestamps, then speed up
    HeroCut { start: f64, end: f64, speed: f64 },
    /// Speed up the whole clip
    Compress { speed: f64 },
}

impl ClipTiming {
    /// Playback speed multiplier (1.0 = unchanged).
    pub fn speed(&self) -> f64 {
        match self {
            ClipTiming::Passthrough => 1.0,
            ClipTiming::HeroCut { speed, .. } | ClipTiming::Compress { speed } => *speed,
        }
    }

    /// Playback duration after retiming a clip of `source_secs`.
    pub fn playback_duration(&self, source_secs: f64) -> f64 {
        match self {
            ClipTiming::Passthrough => source_secs,
            ClipTiming::HeroCut { start, end, speed } => (end - start) / speed,
            ClipTiming::Compress { speed } => source_secs / speed,
        }
    }
}

impl TimingPolicy {
    /// Timing treatment for a media item at its slot.
    pub fn plan_clip(&self, item: &MediaItem, cut_hero_clip: bool) -> ClipTiming {
        let duration = item.probed_duration;

        match item.slot_index {
            0 if cut_hero_clip && duration >= self.hero_window_secs => {
                let start = (duration - self.hero_window_secs) / 2.0;
                ClipTiming::HeroCut {
                    start,
                    end: start + self.hero_window_secs,
                    speed: self.hero_window_secs / self.hero_playback_secs,
                }
            }
            1 if duration > self.second_clip_cap_secs => ClipTiming::Compress {
                speed: duration / self.second_clip_cap_secs,
            },
            _ => ClipTiming::Passthrough,
        }
    }

    /// Visual runtime used to size the narration track.
    pub fn body_duration(&self, items: &[MediaItem], cut_hero_clip: bool) -> f64 {
        items
            .iter()
            .map(|item| match item.slot_index {
                0 if cut_hero_clip => self.hero_playback_secs,
                1 => item.probed_duration.min(self.second_clip_body_cap_secs),
                _ => item.probed_duration,
            })
            .sum()
    }

    /// Narration length for a body duration, within `[0, ceiling]`.
    pub fn narration_trim(&self, body_duration: f64) -> f64 {
        (body_duration - self.narration_tail_offset_secs)
            .max(0.0)
            .min(self.narration_ceiling_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::MediaKind;

    const EPS: f64 = 1e-9;

    fn video(slot: usize, duration: f64) -> MediaItem {
        MediaItem::new(format!("clip{slot}.mp4"), MediaKind::Video, duration, slot)
    }

    #[test]
    fn test_hero_cut_always_plays_five_seconds() {
        let policy = TimingPolicy::default();
        for duration in [9.0, 20.0, 120.0] {
            let timing = policy.plan_clip(&video(0, duration), true);
            assert!(matches!(timing, ClipTiming::HeroCut { .. }));
            assert!((timing.playback_duration(duration) - 5.0).abs() < EPS);
            assert!((timing.speed() - 1.8).abs() < EPS);
        }
    }

    #[test]
    fn test_hero_window_is_centered() {
        let policy = TimingPolicy::default();
        match policy.plan_clip(&video(0, 20.0), true) {
            ClipTiming::HeroCut { start, end, .. } => {
                assert!((start - 5.5).abs() < EPS);
                assert!((end - 14.5).abs() < EPS);
            }
            other => panic!("expected HeroCut, got {:?}", other),
        }
    }

    #[test]
    fn test_hero_passthrough_when_short_or_disabled() {
        let policy = TimingPolicy::default();
        assert_eq!(policy.plan_clip(&video(0, 8.99), true), ClipTiming::Passthrough);
        assert_eq!(policy.plan_clip(&video(0, 30.0), false), ClipTiming::Passthrough);
        assert_eq!(policy.plan_clip(&video(0, 30.0), false).speed(), 1.0);
    }

    #[test]
    fn test_second_clip_compression() {
        let policy = TimingPolicy::default();
        assert_eq!(policy.plan_clip(&video(1, 31.9), true), ClipTiming::Passthrough);
        assert_eq!(policy.plan_clip(&video(1, 10.0), true), ClipTiming::Passthrough);

        let timing = policy.plan_clip(&video(1, 40.0), true);
        assert!(matches!(timing, ClipTiming::Compress { .. }));
        assert!((timing.playback_duration(40.0) - 31.9).abs() < EPS);
    }

    #[test]
    fn test_later_slots_untouched() {
        let policy = TimingPolicy::default();
        assert_eq!(policy.plan_clip(&video(2, 300.0), true), ClipTiming::Passthrough);
        assert_eq!(policy.plan_clip(&video(5, 1.0), true), ClipTiming::Passthrough);
    }

    #[test]
    fn test_narration_trim_bounds() {
        let policy = TimingPolicy::default();
        for body in [0.0, 0.05, 0.1, 10.0, 44.9, 44.95, 100.0, 1e6] {
            let trim = policy.narration_trim(body);
            assert!(trim >= 0.0, "body {body} gave {trim}");
            assert!(trim <= NARRATION_CEILING_SECS, "body {body} gave {trim}");
        }
        assert_eq!(policy.narration_trim(policy.body_duration(&[], true)), 0.0);
        assert_eq!(policy.narration_trim(policy.body_duration(&[], false)), 0.0);
    }

    #[test]
    fn test_body_duration_scenario() {
        let policy = TimingPolicy::default();
        let items = vec![
            MediaItem::new("hero.jpg", MediaKind::Image, 3.0, 0),
            video(1, 10.0),
            video(2, 25.0),
        ];

        let body = policy.body_duration(&items, true);
        assert!((body - 40.0).abs() < EPS);
        assert!((policy.narration_trim(body) - 39.9).abs() < EPS);
    }

    #[test]
    fn test_body_duration_caps_second_slot() {
        let policy = TimingPolicy::default();
        let items = vec![video(0, 12.0), video(1, 60.0)];
        assert!((policy.body_duration(&items, false) - (12.0 + 38.9)).abs() < EPS);
        assert!((policy.body_duration(&items, true) - (5.0 + 38.9)).abs() < EPS);
        assert!((policy.narration_trim(43.9) - 43.8).abs() < EPS);
        assert!((policy.narration_trim(50.9) - 44.8).abs() < EPS);
    }
}
