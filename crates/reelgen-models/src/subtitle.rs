//! Subtitle cues and SRT rendering.

use serde::{Deserialize, Serialize};

/// A single timed caption line.
///
/// Cue sequences are ordered, non-overlapping, with strictly increasing
/// start times, and never extend past the narration duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    /// Start time in seconds from the beginning of narration
    pub start_secs: f64,
    /// End time in seconds; always greater than `start_secs`
    pub end_secs: f64,
    /// Caption text
    pub text: String,
}

impl SubtitleCue {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
fn format_srt_time(secs: f64) -> String {
    let total_millis = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Render an ordered cue sequence as SRT.
pub fn cues_to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for (index, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(cue.start_secs),
            format_srt_time(cue.end_secs),
            cue.text.trim()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srt_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(1.5), "00:00:01,500");
        assert_eq!(format_srt_time(61.042), "00:01:01,042");
        assert_eq!(format_srt_time(3661.0), "01:01:01,000");
    }

    #[test]
    fn srt_rendering_numbers_cues_from_one() {
        let cues = vec![
            SubtitleCue::new(0.0, 1.2, "hello there"),
            SubtitleCue::new(1.2, 2.5, "general viewer"),
        ];
        let srt = cues_to_srt(&cues);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,200\nhello there\n\n"));
        assert!(srt.contains("2\n00:00:01,200 --> 00:00:02,500\ngeneral viewer\n\n"));
    }
}
