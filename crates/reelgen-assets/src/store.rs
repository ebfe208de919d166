//! File-backed content store for generated artifacts.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use reelgen_models::{AssetKind, AssetRef};

/// Writes generated content under a root directory and hands back
/// references. The `location` on returned [`AssetRef`]s is the absolute
/// file path.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist raw content and return a reference to it.
    pub async fn put(&self, kind: AssetKind, bytes: &[u8]) -> std::io::Result<AssetRef> {
        let id = Uuid::new_v4().to_string();
        let path = self.root.join(format!("{id}.{}", kind.extension()));
        fs::write(&path, bytes).await?;
        debug!(asset_id = %id, kind = %kind, bytes = bytes.len(), "stored asset");
        Ok(AssetRef {
            id,
            kind,
            location: path.to_string_lossy().into_owned(),
            duration_secs: None,
        })
    }

    /// Read a text artifact back (subtitle text is consumed by the
    /// aligner as a string).
    pub async fn read_text(&self, asset: &AssetRef) -> std::io::Result<String> {
        fs::read_to_string(&asset.location).await
    }
}
