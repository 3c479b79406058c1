//! Out-of-band storage for uploaded outfit photos.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist `bytes` and return the reference saved on the record.
    async fn save(&self, extension: &str, bytes: &[u8]) -> io::Result<String>;

    /// Remove a previously saved image. Missing files are not an error.
    async fn delete(&self, reference: &str) -> io::Result<()>;
}

/// Stores images under `<root>/outfit_images/YYYY/MM/DD/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a stored reference, refusing anything that escapes the root.
    pub fn resolve(&self, reference: &str) -> io::Result<PathBuf> {
        let relative = Path::new(reference);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image reference: {reference}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, extension: &str, bytes: &[u8]) -> io::Result<String> {
        let reference = format!(
            "outfit_images/{}/{}.{}",
            Utc::now().format("%Y/%m/%d"),
            Uuid::new_v4(),
            extension
        );
        let path = self.resolve(&reference)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.resolve(reference)?).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
