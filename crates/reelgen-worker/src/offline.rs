//! Offline stand-in backends.
//!
//! The CLI runs the full pipeline without any external generation,
//! rendering or hosting service behind it: narration duration is
//! estimated from the script's word count, visuals are placeholder
//! bytes, and uploads succeed immediately. Useful for dry runs and for
//! exercising orchestration end to end.

use async_trait::async_trait;
use uuid::Uuid;

use reelgen_assets::{AssetBackend, GenerateOptions, GeneratedContent, GenerationError, GenerationResult};
use reelgen_media::{RenderBackend, RenderError};
use reelgen_models::{AssetKind, AssetRef, Timeline, UploadMetadata};
use reelgen_upload::{UploadClient, UploadResponse};

/// Approximate narration pace used to estimate audio duration.
const WORDS_PER_SECOND: f64 = 2.5;

/// Generation backend that fabricates assets locally.
#[derive(Debug, Default)]
pub struct OfflineAssetBackend;

#[async_trait]
impl AssetBackend for OfflineAssetBackend {
    async fn produce(
        &self,
        kind: AssetKind,
        prompt: &str,
        options: &GenerateOptions,
    ) -> GenerationResult<GeneratedContent> {
        match kind {
            AssetKind::NarrationAudio => {
                let words = prompt.split_whitespace().count();
                let estimated = (words as f64 / WORDS_PER_SECOND).max(1.0);
                let duration = options.target_secs.unwrap_or(estimated);
                Ok(GeneratedContent::new(format!("narration:{words} words").into_bytes())
                    .with_duration(duration))
            }
            AssetKind::Image => Ok(GeneratedContent::new(
                format!("image:{}:{}", options.preset, prompt).into_bytes(),
            )),
            AssetKind::SubtitleText => Ok(GeneratedContent::new(prompt.as_bytes().to_vec())),
            AssetKind::Music => Err(GenerationError::permanent(
                "music tracks come from the library, not generation",
            )),
            AssetKind::Video => Err(GenerationError::permanent(
                "video artifacts come from the render stage",
            )),
        }
    }
}

/// Render backend that emits a placeholder artifact without touching
/// any media.
#[derive(Debug, Default)]
pub struct OfflineRenderBackend;

#[async_trait]
impl RenderBackend for OfflineRenderBackend {
    async fn render(&self, timeline: &Timeline) -> Result<AssetRef, RenderError> {
        let asset = AssetRef::new(
            AssetKind::Video,
            format!("offline/render-{}.mp4", Uuid::new_v4()),
        )
        .with_duration(timeline.narration_secs);
        Ok(asset)
    }
}

/// Upload client that accepts everything.
#[derive(Debug, Default)]
pub struct OfflineUploadClient;

#[async_trait]
impl UploadClient for OfflineUploadClient {
    async fn upload(
        &self,
        _token: &str,
        _video: &AssetRef,
        _metadata: &UploadMetadata,
    ) -> UploadResponse {
        UploadResponse::Ok {
            remote_id: format!("offline-{}", Uuid::new_v4()),
        }
    }
}
