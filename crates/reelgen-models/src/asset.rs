//! References to generated media artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of artifact a generation backend can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Narration voice-over audio
    NarrationAudio,
    /// Still image used as a visual segment
    Image,
    /// Subtitle/caption text
    SubtitleText,
    /// Background music track
    Music,
    /// Rendered video file
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::NarrationAudio => "narration_audio",
            AssetKind::Image => "image",
            AssetKind::SubtitleText => "subtitle_text",
            AssetKind::Music => "music",
            AssetKind::Video => "video",
        }
    }

    /// File extension used when the content store persists this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::NarrationAudio => "mp3",
            AssetKind::Image => "jpg",
            AssetKind::SubtitleText => "txt",
            AssetKind::Music => "mp3",
            AssetKind::Video => "mp4",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque reference to a stored artifact.
///
/// Job records carry only references like this, never raw bytes. The
/// `location` is interpreted by the content store that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Unique asset identifier
    pub id: String,
    /// Artifact kind
    pub kind: AssetKind,
    /// Storage location (path or handle), owned by the content store
    pub location: String,
    /// Media duration in seconds, when known (audio/video)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl AssetRef {
    /// Create a reference with a fresh random id.
    pub fn new(kind: AssetKind, location: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            location: location.into(),
            duration_secs: None,
        }
    }

    /// Attach a known media duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
