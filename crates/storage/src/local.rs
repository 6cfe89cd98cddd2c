//! Filesystem-backed content store.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use shelfmark_core::error::CoreError;
use shelfmark_core::queue::ports::{ArtifactMeta, ArtifactReader, ContentStore};
use shelfmark_core::range::ByteRange;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Serves artifacts from files under a root directory. A key is a relative
/// path; anything that would escape the root is treated as missing.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }
}

fn io_error(key: &str, op: &str, err: std::io::Error) -> CoreError {
    tracing::error!(key, op, error = %err, "Content store I/O failure");
    CoreError::Internal(format!("Failed to {op} content artifact"))
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn metadata(&self, key: &str) -> Result<Option<ArtifactMeta>, CoreError> {
        let Some(path) = self.resolve(key) else {
            tracing::warn!(key, "Rejected content key outside the store root");
            return Ok(None);
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(ArtifactMeta {
                size: meta.len(),
                content_type: None,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, "stat", e)),
        }
    }

    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ArtifactReader, CoreError> {
        let path = self.resolve(key).ok_or(CoreError::NotFound {
            entity: "ContentArtifact",
            id: 0,
        })?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| io_error(key, "open", e))?;

        match range {
            Some(r) => {
                file.seek(SeekFrom::Start(r.start))
                    .await
                    .map_err(|e| io_error(key, "seek", e))?;
                Ok(Box::pin(file.take(r.length())))
            }
            None => Ok(Box::pin(file)),
        }
    }
}
