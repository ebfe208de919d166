//! Gateway over pluggable generation backends.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use reelgen_models::{AssetKind, AssetRef};

use crate::error::{GenerationError, GenerationResult};
use crate::store::ContentStore;

/// Options forwarded to generation backends.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Style/preset identifier from the job spec
    pub preset: String,
    /// Narration voice selection
    pub voice: Option<String>,
    /// Visual style hint for image generation
    pub style_hint: Option<String>,
    /// Backend seed for reproducible output
    pub seed: Option<u64>,
    /// Requested media duration
    pub target_secs: Option<f64>,
}

impl GenerateOptions {
    pub fn for_preset(preset: impl Into<String>) -> Self {
        Self {
            preset: preset.into(),
            ..Default::default()
        }
    }
}

/// Raw content produced by a backend before it is persisted.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub bytes: Vec<u8>,
    /// Duration of audio/video content, when the backend knows it
    pub duration_secs: Option<f64>,
}

impl GeneratedContent {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            duration_secs: None,
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

/// A media-generation backend (TTS, image synthesis, script/caption text).
///
/// Implementations classify their failures as transient or permanent;
/// callers retry only transient ones.
#[async_trait]
pub trait AssetBackend: Send + Sync {
    async fn produce(
        &self,
        kind: AssetKind,
        prompt: &str,
        options: &GenerateOptions,
    ) -> GenerationResult<GeneratedContent>;
}

/// Uniform entry point for asset generation.
///
/// Persists backend output through the content store and returns only the
/// reference. Safe to call again after a transient error.
#[derive(Clone)]
pub struct AssetGateway {
    backend: Arc<dyn AssetBackend>,
    store: ContentStore,
}

impl AssetGateway {
    pub fn new(backend: Arc<dyn AssetBackend>, store: ContentStore) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Generate one asset and persist it.
    pub async fn generate(
        &self,
        kind: AssetKind,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<AssetRef, GenerationError> {
        let content = self.backend.produce(kind, prompt, options).await?;
        let mut asset = self.store.put(kind, &content.bytes).await?;
        if let Some(secs) = content.duration_secs {
            asset = asset.with_duration(secs);
        }
        debug!(kind = %kind, asset = %asset, "generated asset");
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend;

    #[async_trait]
    impl AssetBackend for FixedBackend {
        async fn produce(
            &self,
            kind: AssetKind,
            prompt: &str,
            _options: &GenerateOptions,
        ) -> GenerationResult<GeneratedContent> {
            match kind {
                AssetKind::NarrationAudio => {
                    Ok(GeneratedContent::new(b"audio".to_vec()).with_duration(7.5))
                }
                AssetKind::SubtitleText => {
                    Ok(GeneratedContent::new(prompt.as_bytes().to_vec()))
                }
                _ => Err(GenerationError::permanent("unsupported kind")),
            }
        }
    }

    #[tokio::test]
    async fn gateway_persists_and_returns_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();
        let gateway = AssetGateway::new(Arc::new(FixedBackend), store);

        let narration = gateway
            .generate(
                AssetKind::NarrationAudio,
                "say something",
                &GenerateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(narration.duration_secs, Some(7.5));

        let text = gateway
            .generate(
                AssetKind::SubtitleText,
                "the caption",
                &GenerateOptions::default(),
            )
            .await
            .unwrap();
        let read = gateway.store().read_text(&text).await.unwrap();
        assert_eq!(read, "the caption");
    }

    #[tokio::test]
    async fn permanent_errors_are_not_transient() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path()).await.unwrap();
        let gateway = AssetGateway::new(Arc::new(FixedBackend), store);

        let err = gateway
            .generate(AssetKind::Image, "a scene", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}
