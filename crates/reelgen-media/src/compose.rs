//! Composer: merge narration, visuals, music and cues into one timeline.
//!
//! Composition is declarative. The timeline records what the render
//! backend should do (segment durations, music mix levels); no media is
//! touched here.

use tracing::debug;

use reelgen_models::{AssetRef, MusicMix, MusicTrack, SubtitleCue, Timeline, VisualSegment};

use crate::error::CompositionError;

const EPSILON: f64 = 1e-6;

/// Composer tuning values.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Duration given to a visual with no intrinsic duration of its own
    pub default_segment_secs: f64,
    /// Music mixing instruction recorded on the timeline
    pub music: MusicMix,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            default_segment_secs: 4.0,
            music: MusicMix::default(),
        }
    }
}

/// Build a timeline whose visuals exactly cover the narration.
///
/// If the visuals fall short, the last segment is held longer to cover
/// the gap; if they run long, trailing segments are truncated (the
/// segment crossing the boundary is trimmed).
pub fn compose(
    narration: AssetRef,
    narration_secs: f64,
    visuals: Vec<AssetRef>,
    music: Option<AssetRef>,
    cues: Vec<SubtitleCue>,
    config: &ComposerConfig,
) -> Result<Timeline, CompositionError> {
    if visuals.is_empty() {
        return Err(CompositionError::NoVisuals);
    }
    if !narration_secs.is_finite() || narration_secs < 0.0 {
        return Err(CompositionError::InvalidNarrationDuration(narration_secs));
    }

    let mut segments: Vec<VisualSegment> = visuals
        .into_iter()
        .map(|asset| {
            let duration = asset
                .duration_secs
                .unwrap_or(config.default_segment_secs);
            VisualSegment::new(asset, duration)
        })
        .collect();

    let total: f64 = segments.iter().map(|s| s.duration_secs).sum();
    if total + EPSILON < narration_secs {
        // Hold the last visual to cover the remainder.
        let deficit = narration_secs - total;
        if let Some(last) = segments.last_mut() {
            last.duration_secs += deficit;
        }
        debug!(deficit, "extended last visual segment");
    } else if total > narration_secs + EPSILON {
        let mut covered = 0.0;
        let mut retained = Vec::with_capacity(segments.len());
        for mut segment in segments {
            if covered + segment.duration_secs <= narration_secs + EPSILON {
                covered += segment.duration_secs;
                retained.push(segment);
            } else {
                let remainder = narration_secs - covered;
                if remainder > EPSILON {
                    segment.duration_secs = remainder;
                    retained.push(segment);
                }
                break;
            }
        }
        debug!(
            dropped = true,
            "truncated trailing visual segments to narration length"
        );
        segments = retained;
    }

    let music = music.map(|source| MusicTrack {
        source,
        mix: config.music.clone(),
    });

    Ok(Timeline {
        narration,
        narration_secs,
        visuals: segments,
        music,
        cues,
    })
}
