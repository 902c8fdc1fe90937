//! Chat provider abstraction and its error taxonomy

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::error::{Error, GenerationError};

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::HuggingFace, ProviderKind::OpenAi];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" => Ok(ProviderKind::HuggingFace),
            "openai" => Ok(ProviderKind::OpenAi),
            _ => Err(Error::config("Provider must be 'huggingface' or 'openai'")),
        }
    }
}

/// Sampling parameters sent with every completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.2,
        }
    }
}

impl From<&LlmConfig> for GenerationParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Failure reported by a provider adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Unknown, unsupported or unavailable model
    #[error("{0}")]
    Model(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// Server-side failure (5xx)
    #[error("provider unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Failure the adapter could not type
    #[error("{0}")]
    Opaque(String),
}

impl ProviderError {
    /// Whether repeating the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout(_) | ProviderError::Unavailable { .. } | ProviderError::Transport(_)
        )
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited(_) => GenerationError::RateLimited,
            ProviderError::Model(message) => GenerationError::Model(message),
            ProviderError::Opaque(message) => classify_message(&message),
            other => GenerationError::Failed(other.to_string()),
        }
    }
}

/// Best-effort classification of an untyped failure message.
///
/// Approximate: any mention of "model" counts as a model error.
pub fn classify_message(message: &str) -> GenerationError {
    let lowered = message.to_lowercase();
    if lowered.contains("rate limit") {
        GenerationError::RateLimited
    } else if lowered.contains("model") {
        GenerationError::Model(message.to_string())
    } else {
        GenerationError::Failed(message.to_string())
    }
}

/// A remote chat-completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// One system + one user message in, assistant text out (untrimmed)
    async fn chat_complete(
        &self,
        system: &str,
        user: &str,
        model: &str,
        api_key: &str,
        params: &GenerationParams,
    ) -> std::result::Result<String, ProviderError>;
}
