//! Core types for the RAG system

pub mod document;
pub mod request;
pub mod response;

pub use document::{Document, DocumentPaths, DocumentSummary, IndexMetadata};
pub use request::ChatRequest;
pub use response::{ChatResponse, DocumentListResponse, MessageResponse, UploadResponse};
