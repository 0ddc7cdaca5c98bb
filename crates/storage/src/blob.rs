use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use onboard_core::store::{BlobStore, UploadError};

/// Filesystem-backed blob store used under the upload artifact policy.
///
/// Blobs are written beneath a fixed root directory; the returned reference
/// is a `file://` URL. A managed object store can replace this behind the
/// same trait without touching the pipeline.
#[derive(Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates the store, ensuring the root directory exists.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|err| UploadError::Failed(format!("create blob root: {err}")))?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|part| matches!(part, Component::Normal(_)));
        if path.is_empty() || !safe {
            return Err(UploadError::Failed(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<String, UploadError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| UploadError::Failed(format!("create blob directory: {err}")))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|err| UploadError::Failed(format!("write blob: {err}")))?;

        debug!(path, size = bytes.len(), "blob stored");
        Ok(format!("file://{}", target.display()))
    }
}
