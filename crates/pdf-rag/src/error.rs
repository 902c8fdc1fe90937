//! Error types for the RAG service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Answer generation failures, as surfaced to callers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider refused the call because of rate limiting
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited,

    /// The provider rejected or could not serve the requested model
    #[error("Model error: {0}")]
    Model(String),

    /// Any other remote failure
    #[error("Failed to generate answer: {0}")]
    Failed(String),
}

/// RAG service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing caller input (model id, provider, API key, top_k, config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload is not a PDF
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Unknown document id (neither resident nor persisted)
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Retrieval ran but produced nothing to answer from
    #[error("No relevant content found for document {0}")]
    NoRelevantChunks(String),

    /// Source text empty or unparsable
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Index or metadata read/write failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Embedding model load or inference failure
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Query vector does not fit the index it is searched against
    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    ModelMismatch { expected: usize, actual: usize },

    /// Remote LLM failure
    #[error("{0}")]
    Generation(#[from] GenerationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    NotFound,
    Extraction,
    Persistence,
    Embedding,
    ModelMismatch,
    RateLimited,
    ModelError,
    Generation,
    Internal,
}

impl ErrorKind {
    /// Wire name used in error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Extraction => "extraction_error",
            ErrorKind::Persistence => "persistence_error",
            ErrorKind::Embedding => "embedding_error",
            ErrorKind::ModelMismatch => "model_mismatch",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ModelError => "model_error",
            ErrorKind::Generation => "generation_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::UnsupportedFileType(_) => ErrorKind::Config,
            Error::DocumentNotFound(_) | Error::NoRelevantChunks(_) => ErrorKind::NotFound,
            Error::Extraction(_) => ErrorKind::Extraction,
            Error::Persistence(_) | Error::Json(_) => ErrorKind::Persistence,
            Error::Embedding(_) => ErrorKind::Embedding,
            Error::ModelMismatch { .. } => ErrorKind::ModelMismatch,
            Error::Generation(GenerationError::RateLimited) => ErrorKind::RateLimited,
            Error::Generation(GenerationError::Model(_)) => ErrorKind::ModelError,
            Error::Generation(GenerationError::Failed(_)) => ErrorKind::Generation,
            Error::Io(_) | Error::Http(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Config | ErrorKind::Extraction => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ModelMismatch => StatusCode::CONFLICT,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ModelError | ErrorKind::Generation => StatusCode::BAD_GATEWAY,
            ErrorKind::Persistence | ErrorKind::Embedding | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind().as_str(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
