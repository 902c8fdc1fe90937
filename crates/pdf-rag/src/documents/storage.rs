//! Flat per-document files: upload, index blob and metadata

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::retrieval::FlatIndex;
use crate::types::{DocumentPaths, IndexMetadata};

/// Artifacts read back for a persisted document
pub struct StoredDocument {
    pub metadata: IndexMetadata,
    pub index: FlatIndex,
}

/// On-disk layout under an upload directory and an index directory
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    upload_dir: PathBuf,
    index_dir: PathBuf,
}

impl DocumentStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            index_dir: index_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.upload_dir.clone(), config.index_dir.clone())
    }

    /// Create both directories if missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.index_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::persistence(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn paths(&self, id: Uuid) -> DocumentPaths {
        DocumentPaths {
            upload: self.upload_dir.join(format!("{}.pdf", id)),
            index: self.index_dir.join(format!("{}.index", id)),
            metadata: self.index_dir.join(format!("{}_meta.json", id)),
        }
    }

    /// Write the uploaded bytes
    pub async fn save_upload(&self, paths: &DocumentPaths, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(&paths.upload, bytes)
            .await
            .map_err(|e| Error::persistence(format!("Failed to save file: {}", e)))
    }

    /// Write the index blob, then the metadata, each through a temp file renamed into place
    pub async fn persist(
        &self,
        paths: &DocumentPaths,
        index: &FlatIndex,
        metadata: &IndexMetadata,
    ) -> Result<()> {
        let blob = index.to_bytes()?;
        let meta = serde_json::to_vec(metadata)
            .map_err(|e| Error::persistence(format!("Failed to encode metadata: {}", e)))?;

        write_atomic(paths.index.clone(), blob).await?;
        write_atomic(paths.metadata.clone(), meta).await
    }

    /// Read a persisted document; `None` if its index or metadata file is missing
    pub async fn load(&self, paths: &DocumentPaths) -> Result<Option<StoredDocument>> {
        if !exists(&paths.index).await || !exists(&paths.metadata).await {
            return Ok(None);
        }

        let meta_bytes = tokio::fs::read(&paths.metadata).await.map_err(|e| {
            Error::persistence(format!("Failed to read {}: {}", paths.metadata.display(), e))
        })?;
        let metadata: IndexMetadata = serde_json::from_slice(&meta_bytes).map_err(|e| {
            Error::persistence(format!("Corrupt metadata {}: {}", paths.metadata.display(), e))
        })?;

        let blob = tokio::fs::read(&paths.index).await.map_err(|e| {
            Error::persistence(format!("Failed to read {}: {}", paths.index.display(), e))
        })?;
        let index = FlatIndex::from_bytes(&blob)?;

        Ok(Some(StoredDocument { metadata, index }))
    }

    /// Whether any artifact of the document exists
    pub async fn has_artifacts(&self, paths: &DocumentPaths) -> bool {
        for path in paths.all() {
            if exists(path).await {
                return true;
            }
        }
        false
    }

    /// Remove every artifact that exists; returns how many were removed
    pub async fn remove_artifacts(&self, paths: &DocumentPaths) -> Result<usize> {
        let mut removed = 0;
        for path in paths.all() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::persistence(format!(
                        "Failed to remove {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Ok(removed)
    }

    /// Guard for an upload in progress; see [`PendingUpload`]
    pub fn pending(&self, paths: &DocumentPaths) -> PendingUpload {
        PendingUpload {
            paths: paths.clone(),
            committed: false,
        }
    }
}

/// Files of an upload that has not been registered yet.
///
/// Dropping the guard without [`commit`](Self::commit) removes whatever was
/// written, which covers both failed builds and cancelled requests.
pub struct PendingUpload {
    paths: DocumentPaths,
    committed: bool,
}

impl PendingUpload {
    /// Keep the files
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.paths.all() {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to clean up {}: {}", path.display(), e),
            }
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| Error::internal(format!("Write task failed: {}", e)))?
    .map_err(|e| Error::persistence(format!("Failed to write {}: {}", target.display(), e)))
}
