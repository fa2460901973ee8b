//! File-save capability and the temporary blob references handed to it.
//!
//! An export registers its artifact in a [`BlobRegistry`], which hands back
//! an [`ObjectUrl`]. The saver resolves that URL to fetch the bytes. Dropping
//! the `ObjectUrl` revokes it, so nothing outlives the export that made it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use log::{debug, info};

use crate::export::ExportArtifact;
use crate::{Error, Result};

/// Live `blob:` URLs and the artifacts behind them
#[derive(Default)]
pub struct BlobRegistry {
    next_id: AtomicU64,
    blobs: Mutex<HashMap<String, Arc<ExportArtifact>>>,
}

impl BlobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `artifact` and return a handle that revokes it when dropped
    pub fn create_object_url(self: &Arc<Self>, artifact: ExportArtifact) -> ObjectUrl {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:certgen/{}", id);
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(url.clone(), Arc::new(artifact));
        }
        ObjectUrl {
            url,
            registry: Arc::clone(self),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<ExportArtifact>> {
        self.blobs.lock().ok()?.get(url).cloned()
    }

    /// Returns whether `url` was live
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self
            .blobs
            .lock()
            .map(|mut b| b.remove(url).is_some())
            .unwrap_or(false);
        if removed {
            debug!("revoked {}", url);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }
}

/// A registered blob URL; revoked on drop
pub struct ObjectUrl {
    url: String,
    registry: Arc<BlobRegistry>,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

/// A download offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub filename: String,
}

/// Where a download ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub location: String,
    pub bytes_written: usize,
}

pub trait FileSaver: Send + Sync {
    fn save<'a>(&'a self, download: &'a Download, blobs: &'a BlobRegistry) -> BoxFuture<'a, Result<SavedFile>>;
}

fn resolve_download(download: &Download, blobs: &BlobRegistry) -> Result<Arc<ExportArtifact>> {
    blobs
        .resolve(&download.url)
        .ok_or_else(|| Error::SaveError(format!("{} is not a live blob URL", download.url)))
}

/// Writes downloads into a directory
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySaver { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DirectorySaver {
    fn save<'a>(&'a self, download: &'a Download, blobs: &'a BlobRegistry) -> BoxFuture<'a, Result<SavedFile>> {
        Box::pin(async move {
            let artifact = resolve_download(download, blobs)?;
            if download.filename.contains(['/', '\\']) {
                return Err(Error::SaveError(format!("invalid filename {:?}", download.filename)));
            }
            tokio::fs::create_dir_all(&self.dir).await?;
            let path = self.dir.join(&download.filename);
            tokio::fs::write(&path, &artifact.bytes).await?;
            info!("saved {} ({} bytes)", path.display(), artifact.bytes.len());
            Ok(SavedFile {
                location: path.display().to_string(),
                bytes_written: artifact.bytes.len(),
            })
        })
    }
}

/// Keeps downloads in memory for tests
#[derive(Default)]
pub struct MemorySaver {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved `(filename, bytes)` pairs in order
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl FileSaver for MemorySaver {
    fn save<'a>(&'a self, download: &'a Download, blobs: &'a BlobRegistry) -> BoxFuture<'a, Result<SavedFile>> {
        Box::pin(async move {
            let artifact = resolve_download(download, blobs)?;
            let mut files = self
                .files
                .lock()
                .map_err(|_| Error::SaveError("saver state poisoned".into()))?;
            files.push((download.filename.clone(), artifact.bytes.clone()));
            Ok(SavedFile {
                location: format!("memory:{}", download.filename),
                bytes_written: artifact.bytes.len(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ExportArtifact {
        ExportArtifact {
            bytes: vec![1, 2, 3],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn object_url_revokes_on_drop() {
        let reg = BlobRegistry::new();
        let url = reg.create_object_url(artifact());
        let s = url.as_str().to_string();
        assert!(s.starts_with("blob:certgen/"));
        assert_eq!(reg.resolve(&s).unwrap().bytes, vec![1, 2, 3]);
        drop(url);
        assert!(reg.resolve(&s).is_none());
        assert_eq!(reg.live_count(), 0);
    }

    #[test]
    fn object_urls_are_unique() {
        let reg = BlobRegistry::new();
        let a = reg.create_object_url(artifact());
        let b = reg.create_object_url(artifact());
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(reg.live_count(), 2);
    }

    #[tokio::test]
    async fn directory_saver_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let reg = BlobRegistry::new();
        let url = reg.create_object_url(artifact());
        let download = Download {
            url: url.as_str().to_string(),
            filename: "c.png".into(),
        };
        let saved = DirectorySaver::new(dir.path()).save(&download, &reg).await.unwrap();
        assert_eq!(saved.bytes_written, 3);
        assert_eq!(std::fs::read(dir.path().join("c.png")).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn saving_a_revoked_url_fails() {
        let reg = BlobRegistry::new();
        let url = reg.create_object_url(artifact());
        let download = Download {
            url: url.as_str().to_string(),
            filename: "c.png".into(),
        };
        drop(url);
        let err = MemorySaver::new().save(&download, &reg).await.unwrap_err();
        assert!(matches!(err, Error::SaveError(_)));
    }
}
