//! pdf-rag: question answering over uploaded PDF documents
//!
//! Uploaded PDFs are split into overlapping token windows, embedded with a
//! local ONNX sentence-transformer and stored in an exact inner-product index
//! persisted next to the upload. Questions are answered by retrieving the
//! best-matching passages and handing them to a remote chat model (OpenAI or
//! the HuggingFace inference router).

pub mod catalog;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use documents::{DocumentManager, DocumentStorage};
pub use embeddings::{EmbeddingModel, EmbeddingProvider, ModelLoader};
pub use error::{Error, ErrorKind, GenerationError, Result};
pub use generation::{AnswerGenerator, ChatProvider, ProviderError, ProviderKind};
pub use types::{ChatRequest, ChatResponse, Document, DocumentSummary, UploadResponse};
