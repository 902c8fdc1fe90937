//! Indexed document records

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::retrieval::FlatIndex;

/// Where a document's artifacts live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    /// Saved upload (`{id}.pdf`)
    pub upload: PathBuf,
    /// Index blob (`{id}.index`)
    pub index: PathBuf,
    /// Chunk/model metadata (`{id}_meta.json`)
    pub metadata: PathBuf,
}

impl DocumentPaths {
    pub fn all(&self) -> [&PathBuf; 3] {
        [&self.upload, &self.index, &self.metadata]
    }
}

/// A fully indexed document. Immutable once built.
///
/// `chunks[i]` is the text of index row `i`.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    /// Original upload name
    pub filename: String,
    /// Model the index was built with; queries must use the same one
    pub embedding_model: String,
    pub chunks: Vec<String>,
    pub index: Arc<FlatIndex>,
    pub paths: DocumentPaths,
}

impl Document {
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Listing projection
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            document_id: self.id.to_string(),
            filename: self.filename.clone(),
            num_chunks: self.num_chunks(),
            embedding_model: self.embedding_model.clone(),
        }
    }
}

/// Persisted `{id}_meta.json` record; `chunks` order is the row order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub chunks: Vec<String>,
    /// Absent in records that predate model tracking; such documents cannot be reloaded
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Read-only view of a resident document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
    pub num_chunks: usize,
    pub embedding_model: String,
}
