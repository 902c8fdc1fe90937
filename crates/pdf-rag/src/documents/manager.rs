//! Document lifecycle: upload, chat (with reload), list, delete

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::storage::{DocumentStorage, StoredDocument};
use crate::config::RagConfig;
use crate::embeddings::{EmbeddingProvider, HubClient, OnnxModelLoader};
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::ingestion::{is_pdf_filename, Chunker, HfTokenCodec, PdfTextExtractor, TextExtractor};
use crate::processing::ComputePool;
use crate::retrieval::{FlatIndex, Retriever};
use crate::types::{ChatRequest, ChatResponse, Document, DocumentPaths, DocumentSummary, IndexMetadata};

/// Owns the registry of resident documents and the pipeline that builds them.
///
/// A document is registered only after its index and metadata are on disk, so
/// readers never see a partially built one. Reloads and deletes of the same id
/// hold that id's lock, so a delete cannot be undone by a reload in flight.
pub struct DocumentManager {
    documents: DashMap<Uuid, Arc<Document>>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    storage: DocumentStorage,
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
    embeddings: Arc<EmbeddingProvider>,
    retriever: Retriever,
    generator: AnswerGenerator,
    pool: ComputePool,
}

impl DocumentManager {
    pub fn new(
        storage: DocumentStorage,
        extractor: Arc<dyn TextExtractor>,
        chunker: Chunker,
        embeddings: Arc<EmbeddingProvider>,
        generator: AnswerGenerator,
        pool: ComputePool,
    ) -> Self {
        Self {
            documents: DashMap::new(),
            locks: DashMap::new(),
            storage,
            extractor,
            chunker,
            retriever: Retriever::new(Arc::clone(&embeddings), pool.clone()),
            embeddings,
            generator,
            pool,
        }
    }

    /// Production wiring: PDF extraction, hub tokenizer, ONNX embeddings, HTTP providers
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        let storage = DocumentStorage::from_config(&config.storage);
        storage.ensure_dirs().await?;

        let pool = ComputePool::new(config.processing.workers());
        tracing::info!("Compute pool: {} workers", pool.workers());

        let hub = HubClient::from_config(&config.embeddings);
        let tokenizer_path = hub.fetch(&config.chunking.tokenizer, "tokenizer.json").await?;
        let codec = HfTokenCodec::from_file(&tokenizer_path)?;
        let chunker = Chunker::from_config(Arc::new(codec), &config.chunking)?;
        tracing::info!(
            "Chunker ready ({} tokens, {} overlap, tokenizer {})",
            chunker.max_tokens(),
            chunker.overlap_tokens(),
            config.chunking.tokenizer
        );

        let loader = OnnxModelLoader::new(hub, &config.embeddings);
        let embeddings = Arc::new(EmbeddingProvider::new(Arc::new(loader), pool.clone()));
        let generator = AnswerGenerator::from_config(&config.llm)?;

        Ok(Self::new(
            storage,
            Arc::new(PdfTextExtractor),
            chunker,
            embeddings,
            generator,
            pool,
        ))
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingProvider> {
        &self.embeddings
    }

    pub fn storage(&self) -> &DocumentStorage {
        &self.storage
    }

    /// Resident document, if any
    pub fn get(&self, id: &Uuid) -> Option<Arc<Document>> {
        self.documents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn resident_count(&self) -> usize {
        self.documents.len()
    }

    /// Save, extract, chunk, embed, index and persist an uploaded PDF.
    ///
    /// On any failure after the upload is saved, every file written for it is
    /// removed and nothing is registered.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        embedding_model: &str,
    ) -> Result<Arc<Document>> {
        if !is_pdf_filename(filename) {
            return Err(Error::UnsupportedFileType(format!(
                "'{}' (only PDF files are allowed)",
                filename
            )));
        }
        let embedding_model = embedding_model.trim();
        if embedding_model.is_empty() {
            return Err(Error::config("Embedding model is required"));
        }

        let id = Uuid::new_v4();
        let paths = self.storage.paths(id);
        tracing::info!("Uploading {} as {} ({} bytes)", filename, id, bytes.len());

        let pending = self.storage.pending(&paths);
        let built = match self.storage.save_upload(&paths, bytes).await {
            Ok(()) => self.build(id, filename, embedding_model, paths.clone()).await,
            Err(e) => Err(e),
        };

        match built {
            Ok(document) => {
                let document = Arc::new(document);
                self.documents.insert(id, Arc::clone(&document));
                pending.commit();
                tracing::info!(
                    "Indexed {} ({}): {} chunks with {}",
                    filename,
                    id,
                    document.num_chunks(),
                    embedding_model
                );
                Ok(document)
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", filename, e);
                drop(pending);
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        id: Uuid,
        filename: &str,
        embedding_model: &str,
        paths: DocumentPaths,
    ) -> Result<Document> {
        let extractor = Arc::clone(&self.extractor);
        let upload_path = paths.upload.clone();
        let text = self
            .pool
            .run(move || extractor.extract(&upload_path))
            .await??;
        if text.trim().is_empty() {
            return Err(Error::extraction("Could not extract text from PDF"));
        }
        tracing::debug!("Extracted {} characters from {}", text.len(), filename);

        let chunker = self.chunker.clone();
        let chunks = self.pool.run(move || chunker.chunk(&text)).await??;
        if chunks.is_empty() {
            return Err(Error::extraction("Could not create chunks from PDF"));
        }

        let vectors = self.embeddings.embed(&chunks, embedding_model).await?;
        let index = self.pool.run(move || FlatIndex::build(&vectors)).await??;

        let metadata = IndexMetadata {
            chunks,
            embedding_model: Some(embedding_model.to_string()),
            filename: Some(filename.to_string()),
        };
        self.storage.persist(&paths, &index, &metadata).await?;

        Ok(Document {
            id,
            filename: filename.to_string(),
            embedding_model: embedding_model.to_string(),
            chunks: metadata.chunks,
            index: Arc::new(index),
            paths,
        })
    }

    /// Answer a question about a document, reloading it from disk if it is not resident
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if request.query.trim().is_empty() {
            return Err(Error::config("Query cannot be empty"));
        }
        let provider =
            AnswerGenerator::validate(&request.provider, &request.llm_model, &request.api_key)?;
        if request.top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }

        let document = self.resolve(&request.document_id).await?;

        let retrieved = self
            .retriever
            .retrieve(
                &request.query,
                &document.index,
                &document.chunks,
                request.top_k,
                &document.embedding_model,
            )
            .await?;
        if retrieved.is_empty() {
            return Err(Error::NoRelevantChunks(document.id.to_string()));
        }

        let sources: Vec<String> = retrieved.into_iter().map(|chunk| chunk.text).collect();
        let answer = self
            .generator
            .generate(
                &request.query,
                &sources,
                &request.provider,
                &request.llm_model,
                &request.api_key,
            )
            .await?;

        Ok(ChatResponse {
            answer,
            sources,
            model_used: request.llm_model.clone(),
            provider: provider.as_str().to_string(),
        })
    }

    /// Resident document for `id`, reloading it from disk if needed
    pub async fn resolve(&self, id: &str) -> Result<Arc<Document>> {
        let id = parse_id(id)?;
        if let Some(document) = self.get(&id) {
            return Ok(document);
        }

        let lock = self.lock_for(id);
        let _held = lock.lock().await;
        // another reload may have finished while we waited
        if let Some(document) = self.get(&id) {
            return Ok(document);
        }

        let document = match self.reload(id).await {
            Ok(document) => Arc::new(document),
            Err(e) => {
                if matches!(e, Error::DocumentNotFound(_)) {
                    self.locks.remove(&id);
                }
                return Err(e);
            }
        };
        self.documents.insert(id, Arc::clone(&document));
        Ok(document)
    }

    fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(id).or_default().value())
    }

    async fn reload(&self, id: Uuid) -> Result<Document> {
        let paths = self.storage.paths(id);
        let StoredDocument { metadata, index } = self
            .storage
            .load(&paths)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        let IndexMetadata {
            chunks,
            embedding_model,
            filename,
        } = metadata;

        let embedding_model = embedding_model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| {
                Error::persistence("Document missing embedding_model. Re-upload required.")
            })?;

        if chunks.len() != index.len() {
            return Err(Error::persistence(format!(
                "Document {} has {} chunks but its index has {} rows",
                id,
                chunks.len(),
                index.len()
            )));
        }

        let filename = filename.unwrap_or_else(|| format!("{}.pdf", id));
        tracing::info!(
            "Reloaded document {} ({}) from disk: {} chunks, model {}",
            id,
            filename,
            chunks.len(),
            embedding_model
        );

        Ok(Document {
            id,
            filename,
            embedding_model,
            chunks,
            index: Arc::new(index),
            paths,
        })
    }

    /// Resident documents, sorted by filename then id
    pub fn list(&self) -> Vec<DocumentSummary> {
        let mut summaries: Vec<DocumentSummary> = self
            .documents
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        summaries.sort_by(|a, b| {
            a.filename
                .cmp(&b.filename)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        summaries
    }

    /// Remove a document from memory and disk
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        let lock = self.lock_for(id);
        let held = lock.lock().await;

        let resident = self.documents.remove(&id).map(|(_, document)| document);
        let paths = resident
            .as_ref()
            .map(|document| document.paths.clone())
            .unwrap_or_else(|| self.storage.paths(id));
        let removed = self.storage.remove_artifacts(&paths).await;

        drop(held);
        self.locks.remove(&id);
        let removed = removed?;

        if resident.is_none() && removed == 0 {
            return Err(Error::DocumentNotFound(id.to_string()));
        }

        tracing::info!("Deleted document {} ({} files removed)", id, removed);
        Ok(())
    }

    /// Drop a document from memory only; it stays reloadable from disk
    pub fn evict(&self, id: &Uuid) -> bool {
        let evicted = self.documents.remove(id).is_some();
        if evicted {
            tracing::debug!("Evicted document {}", id);
        }
        evicted
    }

    /// Drop every resident document and cached model; persisted files stay
    pub fn shutdown(&self) {
        let resident = self.documents.len();
        self.documents.clear();
        self.embeddings.clear();
        tracing::info!("Document manager shut down ({} documents evicted)", resident);
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| Error::DocumentNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_uuid_is_not_found() {
        assert!(matches!(parse_id("../../etc/passwd"), Err(Error::DocumentNotFound(_))));
        assert!(matches!(parse_id(""), Err(Error::DocumentNotFound(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
