//! Subtitle aligner: turn narration duration plus caption text into a
//! timed cue sequence.
//!
//! Raw text is segmented on sentence boundaries and packed into
//! cue-sized chunks under a character cap; time is allocated to each cue
//! proportionally to its character count, stretched where the configured
//! reading speed would be exceeded, and clamped so every cue gets at
//! least the minimum duration without the sequence ever running past the
//! narration.

use tracing::debug;

use reelgen_models::SubtitleCue;

use crate::error::AlignmentError;

const EPSILON: f64 = 1e-6;

/// Tuning values for cue segmentation and timing.
#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Maximum characters per cue
    pub max_chars_per_cue: usize,
    /// Reading-speed threshold in characters per second; cues are
    /// stretched toward this pace when the proportional share is shorter
    pub max_chars_per_second: f64,
    /// Minimum cue duration in seconds
    pub min_cue_secs: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            max_chars_per_cue: 42,
            max_chars_per_second: 17.0,
            min_cue_secs: 0.8,
        }
    }
}

/// Align raw caption text against a narration of known duration.
pub fn align_text(
    narration_secs: f64,
    text: &str,
    config: &AlignerConfig,
) -> Result<Vec<SubtitleCue>, AlignmentError> {
    let chunks = segment_text(text, config.max_chars_per_cue);
    allocate(narration_secs, chunks, config)
}

/// Align pre-segmented caption lines. Lines over the character cap are
/// still split on word boundaries.
pub fn align_lines(
    narration_secs: f64,
    lines: &[String],
    config: &AlignerConfig,
) -> Result<Vec<SubtitleCue>, AlignmentError> {
    let mut chunks = Vec::new();
    for line in lines {
        let line = normalize(line);
        if line.is_empty() {
            continue;
        }
        if line.chars().count() <= config.max_chars_per_cue {
            chunks.push(line);
        } else {
            chunks.extend(split_by_words(&line, config.max_chars_per_cue));
        }
    }
    allocate(narration_secs, chunks, config)
}

fn allocate(
    narration_secs: f64,
    chunks: Vec<String>,
    config: &AlignerConfig,
) -> Result<Vec<SubtitleCue>, AlignmentError> {
    if narration_secs <= EPSILON {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        return Err(AlignmentError::DoesNotFit {
            cues: chunks.len(),
            min_cue_secs: config.min_cue_secs,
            narration_secs,
        });
    }
    if chunks.is_empty() {
        return Err(AlignmentError::EmptyText { narration_secs });
    }

    let required = chunks.len() as f64 * config.min_cue_secs;
    if required > narration_secs + EPSILON {
        return Err(AlignmentError::DoesNotFit {
            cues: chunks.len(),
            min_cue_secs: config.min_cue_secs,
            narration_secs,
        });
    }

    let char_counts: Vec<f64> = chunks.iter().map(|c| c.chars().count() as f64).collect();
    let total_chars: f64 = char_counts.iter().sum();

    // Desired duration per cue: proportional share of the narration,
    // stretched where the reading-speed pace wants more time, never
    // below the minimum.
    let desired: Vec<f64> = char_counts
        .iter()
        .map(|&chars| {
            let proportional = narration_secs * chars / total_chars;
            let paced = chars / config.max_chars_per_second;
            proportional.max(paced).max(config.min_cue_secs)
        })
        .collect();

    let desired_total: f64 = desired.iter().sum();
    let durations: Vec<f64> = if desired_total <= narration_secs {
        desired
    } else {
        // Over budget: shrink only the slack above the minimum, so every
        // cue keeps at least min_cue_secs. Feasibility was checked above,
        // so the remaining budget covers the minimums.
        let budget = narration_secs - required;
        let slack_total: f64 = desired.iter().map(|d| d - config.min_cue_secs).sum();
        desired
            .iter()
            .map(|d| {
                let slack = d - config.min_cue_secs;
                if slack_total > EPSILON {
                    config.min_cue_secs + slack * budget / slack_total
                } else {
                    config.min_cue_secs
                }
            })
            .collect()
    };

    let mut cues = Vec::with_capacity(chunks.len());
    let mut cursor = 0.0;
    for (chunk, duration) in chunks.into_iter().zip(durations) {
        let start = cursor;
        let end = (start + duration).min(narration_secs);
        cues.push(SubtitleCue::new(start, end, chunk));
        cursor = end;
    }

    debug!(
        cues = cues.len(),
        narration_secs, "aligned subtitle cues"
    );
    Ok(cues)
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into sentences, then pack sentences into chunks
/// no longer than `max_chars`. Sentences that alone exceed the cap are
/// split on word boundaries.
fn segment_text(text: &str, max_chars: usize) -> Vec<String> {
    let cleaned = normalize(&text.replace("\\n", "\n"));
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in cleaned.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?' | '…') {
            let s = current.trim().to_string();
            if !s.is_empty() {
                sentences.push(s);
            }
            current.clear();
        }
    }
    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    let mut chunks: Vec<String> = Vec::new();
    for sentence in sentences {
        let pieces = if sentence.chars().count() > max_chars {
            split_by_words(&sentence, max_chars)
        } else {
            vec![sentence]
        };
        for piece in pieces {
            match chunks.last_mut() {
                Some(last) if last.chars().count() + 1 + piece.chars().count() <= max_chars => {
                    last.push(' ');
                    last.push_str(&piece);
                }
                _ => chunks.push(piece),
            }
        }
    }
    chunks
}

fn split_by_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match out.last_mut() {
            Some(last) if last.chars().count() + 1 + word.chars().count() <= max_chars => {
                last.push(' ');
                last.push_str(word);
            }
            _ => out.push(word.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(cues: &[SubtitleCue], narration_secs: f64, config: &AlignerConfig) {
        for cue in cues {
            assert!(cue.end_secs > cue.start_secs, "end must exceed start");
            assert!(
                cue.duration_secs() >= config.min_cue_secs - 1e-6,
                "cue under minimum: {:?}",
                cue
            );
            assert!(cue.start_secs >= 0.0);
            assert!(cue.end_secs <= narration_secs + 1e-6);
        }
        for pair in cues.windows(2) {
            assert!(pair[1].start_secs > pair[0].start_secs, "starts must increase");
            assert!(pair[1].start_secs >= pair[0].end_secs - 1e-6, "cues overlap");
        }
    }

    #[test]
    fn cues_stay_within_narration_across_durations() {
        let config = AlignerConfig::default();
        let text = "The quick brown fox jumps over the lazy dog. \
                    Pack my box with five dozen liquor jugs! \
                    How vexingly quick daft zebras jump?";
        for duration in [4.0, 5.0, 10.0, 30.0, 120.0] {
            let cues = align_text(duration, text, &config).unwrap();
            assert!(!cues.is_empty());
            assert_invariants(&cues, duration, &config);
        }

        // This text packs into four chunks, so durations under
        // 4 x min_cue_secs cannot hold the minimum per cue.
        let err = align_text(3.0, text, &config).unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::DoesNotFit {
                cues: 4,
                narration_secs,
                ..
            } if narration_secs == 3.0
        ));
    }

    #[test]
    fn segmentation_respects_character_cap() {
        let config = AlignerConfig::default();
        let chunks = segment_text(
            "One short. A considerably longer sentence that must certainly be split across \
             several caption chunks to stay readable on screen.",
            config.max_chars_per_cue,
        );
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= config.max_chars_per_cue);
        }
    }

    #[test]
    fn empty_text_with_narration_is_an_error() {
        let config = AlignerConfig::default();
        let err = align_text(5.0, "   ", &config).unwrap_err();
        assert!(matches!(err, AlignmentError::EmptyText { .. }));
    }

    #[test]
    fn zero_duration_with_no_text_yields_no_cues() {
        let config = AlignerConfig::default();
        assert!(align_text(0.0, "", &config).unwrap().is_empty());
    }

    #[test]
    fn too_many_cues_for_duration_is_an_error() {
        let config = AlignerConfig::default();
        // Five 0.8s-minimum cues cannot fit into one second.
        let lines: Vec<String> = (1..=5).map(|i| format!("line {i}")).collect();
        let err = align_lines(1.0, &lines, &config).unwrap_err();
        assert!(matches!(err, AlignmentError::DoesNotFit { cues: 5, .. }));
    }

    #[test]
    fn time_is_allocated_proportionally_to_length() {
        let config = AlignerConfig {
            max_chars_per_cue: 80,
            max_chars_per_second: 1000.0,
            min_cue_secs: 0.1,
        };
        let lines = vec!["aa".to_string(), "aaaaaaaa".to_string()];
        let cues = align_lines(10.0, &lines, &config).unwrap();
        assert_eq!(cues.len(), 2);
        assert!(cues[1].duration_secs() > cues[0].duration_secs() * 3.0);
        assert!((cues[1].end_secs - 10.0).abs() < 1e-6);
    }

    #[test]
    fn minimum_duration_borrows_from_longer_neighbours() {
        let config = AlignerConfig {
            max_chars_per_cue: 120,
            max_chars_per_second: 1000.0,
            min_cue_secs: 1.0,
        };
        // Proportional share of "a" would be far below one second.
        let lines = vec![
            "a".to_string(),
            "a very long line that dominates the proportional allocation entirely".to_string(),
        ];
        let cues = align_lines(3.0, &lines, &config).unwrap();
        assert!(cues[0].duration_secs() >= 1.0 - 1e-6);
        assert!(cues.last().unwrap().end_secs <= 3.0 + 1e-6);
    }

    #[test]
    fn presegmented_lines_keep_their_boundaries() {
        let config = AlignerConfig::default();
        let lines = vec!["first line".to_string(), "second line".to_string()];
        let cues = align_lines(4.0, &lines, &config).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "first line");
        assert_eq!(cues[1].text, "second line");
    }
}
