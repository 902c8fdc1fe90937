//! Query-time retrieval over a document index

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::FlatIndex;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::processing::ComputePool;

/// A chunk selected for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk ordinal (== index row)
    pub position: usize,
    pub text: String,
    /// Inner product with the query (cosine, for unit vectors)
    pub score: f32,
}

/// Embeds queries and ranks a document's chunks against them
#[derive(Clone)]
pub struct Retriever {
    embeddings: Arc<EmbeddingProvider>,
    pool: ComputePool,
}

impl Retriever {
    pub fn new(embeddings: Arc<EmbeddingProvider>, pool: ComputePool) -> Self {
        Self { embeddings, pool }
    }

    /// Top `top_k` chunks for `query`, best first.
    ///
    /// `embedding_model` must be the model the index was built with. Rows
    /// with no corresponding chunk are skipped.
    pub async fn retrieve(
        &self,
        query: &str,
        index: &Arc<FlatIndex>,
        chunks: &[String],
        top_k: usize,
        embedding_model: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }

        let query_vector = self.embeddings.embed_query(query, embedding_model).await?;

        let index = Arc::clone(index);
        let hits = self
            .pool
            .run(move || index.search(&query_vector, top_k))
            .await??;

        let retrieved: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter_map(|hit| {
                chunks.get(hit.row).map(|text| RetrievedChunk {
                    position: hit.row,
                    text: text.clone(),
                    score: hit.score,
                })
            })
            .collect();

        tracing::debug!(
            "Retrieved {} chunks (top_k={}, model={})",
            retrieved.len(),
            top_k,
            embedding_model
        );

        Ok(retrieved)
    }
}
