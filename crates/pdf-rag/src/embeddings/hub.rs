//! Model asset downloads from the HuggingFace hub

use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use tempfile::NamedTempFile;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Fetches repository files into a local cache, one directory per repository
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl HubClient {
    /// Create a client for the hub at `base_url`, caching under `cache_dir`
    pub fn new(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Create from the embeddings section of the config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.hub_url.clone(), config.cache_dir.clone())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local directory for a repository (`org/name` → `org--name`)
    pub fn repo_dir(&self, repo: &str) -> Result<PathBuf> {
        validate_repo(repo)?;
        Ok(self.cache_dir.join(repo.replace('/', "--")))
    }

    /// Return the cached path of `file` in `repo`, downloading it first if needed
    pub async fn fetch(&self, repo: &str, file: &str) -> Result<PathBuf> {
        let dest = self.repo_dir(repo)?.join(file);
        if dest.exists() {
            return Ok(dest);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Config(format!("Failed to create cache directory: {}", e))
            })?;
        }

        let url = format!(
            "{}/{}/resolve/main/{}",
            self.base_url.trim_end_matches('/'),
            repo,
            file
        );
        tracing::info!("Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Failed to download {}: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED => {
                return Err(Error::Config(format!(
                    "Model '{}' is not available on the hub (missing {})",
                    repo, file
                )));
            }
            status => {
                return Err(Error::embedding(format!(
                    "Download of {} failed: HTTP {}",
                    url, status
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::embedding(format!("Failed to read {}: {}", url, e)))?;

        let size = bytes.len();
        let target = dest.clone();
        // each writer gets its own temp file; concurrent fetches of one file both succeed
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = target.parent().unwrap_or_else(|| Path::new("."));
            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::internal(format!("Download task failed: {}", e)))?
        .map_err(|e| Error::embedding(format!("Failed to store {}: {}", dest.display(), e)))?;

        tracing::info!("Downloaded {} ({} bytes)", file, size);
        Ok(dest)
    }
}

fn validate_repo(repo: &str) -> Result<()> {
    let trimmed = repo.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("Model id is required".to_string()));
    }
    if trimmed != repo || repo.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
        return Err(Error::Config(format!("Invalid model id '{}'", repo)));
    }
    Ok(())
}
