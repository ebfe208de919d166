//! Composed video timeline.

use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::subtitle::SubtitleCue;

/// One visual segment on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSegment {
    /// Source image or clip
    pub source: AssetRef,
    /// How long the segment is shown, in seconds
    pub duration_secs: f64,
}

impl VisualSegment {
    pub fn new(source: AssetRef, duration_secs: f64) -> Self {
        Self {
            source,
            duration_secs,
        }
    }
}

/// Declarative music mixing instruction.
///
/// Recorded on the timeline for the render backend to apply; composition
/// itself performs no audio processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicMix {
    /// Music volume relative to full scale (0.0..=1.0)
    pub level: f64,
    /// Reduce music volume while narration is present
    pub duck_under_narration: bool,
    /// Volume used while ducked
    pub ducked_level: f64,
}

impl Default for MusicMix {
    fn default() -> Self {
        Self {
            level: 0.3,
            duck_under_narration: false,
            ducked_level: 0.12,
        }
    }
}

/// Optional background music track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub source: AssetRef,
    pub mix: MusicMix,
}

/// The fully composed, not-yet-rendered representation of one video.
///
/// Invariant: the visual segment durations sum to `narration_secs`
/// (segments are extended or truncated by the composer to match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Narration audio track
    pub narration: AssetRef,
    /// Narration duration in seconds; the target length of the video
    pub narration_secs: f64,
    /// Ordered visual segments
    pub visuals: Vec<VisualSegment>,
    /// Optional background music with its mixing instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicTrack>,
    /// Timed caption cues
    pub cues: Vec<SubtitleCue>,
}

impl Timeline {
    /// Total duration covered by visual segments.
    pub fn total_visual_secs(&self) -> f64 {
        self.visuals.iter().map(|s| s.duration_secs).sum()
    }
}
