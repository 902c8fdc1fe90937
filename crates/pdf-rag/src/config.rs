//! Configuration for the RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// On-disk layout for uploads and indexes
    pub storage: StorageConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; sections missing from the file take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Load from `RAG_CONFIG` if set, then apply `RAG_HOST` / `RAG_PORT` overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os("RAG_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(host) = std::env::var("RAG_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("RAG_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid RAG_PORT '{}': {}", port, e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_tokens == 0 {
            return Err(Error::Config("chunking.max_tokens must be positive".to_string()));
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err(Error::Config(format!(
                "chunking.overlap_tokens ({}) must be smaller than chunking.max_tokens ({})",
                self.chunking.overlap_tokens, self.chunking.max_tokens
            )));
        }
        if self.processing.compute_workers == Some(0) {
            return Err(Error::Config("processing.compute_workers must be positive".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Where uploaded files and per-document index artifacts live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Saved uploads (`{id}.pdf`)
    pub upload_dir: PathBuf,
    /// Index blobs and metadata (`{id}.index`, `{id}_meta.json`)
    pub index_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            index_dir: PathBuf::from("indexes"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Cache directory for downloaded models
    pub cache_dir: PathBuf,
    /// Base URL of the model hub
    pub hub_url: String,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Truncation length for every model; unset uses each model family's own limit
    pub max_length: Option<usize>,
    /// Intra-op threads per ONNX session
    pub intra_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pdf-rag")
                .join("models"),
            hub_url: "https://huggingface.co".to_string(),
            batch_size: 32,
            max_length: None,
            intra_threads: 4,
        }
    }
}

/// Token-window chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in tokens
    pub max_tokens: usize,
    /// Tokens shared by consecutive windows
    pub overlap_tokens: usize,
    /// Hub repository holding the `tokenizer.json` used for counting
    pub tokenizer: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_tokens: 80,
            tokenizer: "Xenova/gpt-4".to_string(), // cl100k_base vocabulary
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI API base URL
    pub openai_base_url: String,
    /// HuggingFace inference router base URL
    pub huggingface_base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for transient failures
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_backoff_ms: u64,
    /// Output token cap
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com/v1".to_string(),
            huggingface_base_url: "https://router.huggingface.co/v1".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_tokens: 500,
            temperature: 0.2, // Low for context-grounded answers
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Concurrent CPU-bound tasks (extraction, inference, index build/search)
    pub compute_workers: Option<usize>, // Auto-detect from CPU count
}

impl ProcessingConfig {
    /// Effective worker count
    pub fn workers(&self) -> usize {
        self.compute_workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.max_tokens, 500);
        assert_eq!(config.chunking.overlap_tokens, 80);
        assert_eq!(config.llm.max_tokens, 500);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [chunking]
            max_tokens = 200

            [storage]
            index_dir = "/tmp/idx"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.max_tokens, 200);
        assert_eq!(config.chunking.overlap_tokens, 80);
        assert_eq!(config.storage.index_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_overlap_must_be_below_window() {
        let mut config = RagConfig::default();
        config.chunking.overlap_tokens = config.chunking.max_tokens;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = RagConfig::default();
        config.processing.compute_workers = Some(0);
        assert!(config.validate().is_err());
        assert_eq!(ProcessingConfig { compute_workers: Some(3) }.workers(), 3);
    }
}
