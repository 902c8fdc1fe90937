//! Deterministic stand-ins for the tokenizer, embedding model, extractor and chat providers

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pdf_rag::documents::{DocumentManager, DocumentStorage};
use pdf_rag::embeddings::{EmbeddingModel, EmbeddingProvider, ModelLoader};
use pdf_rag::generation::{AnswerGenerator, ChatProvider, GenerationParams, ProviderError, ProviderKind};
use pdf_rag::ingestion::{normalize_whitespace, Chunker, TextExtractor, TokenCodec};
use pdf_rag::processing::ComputePool;
use pdf_rag::{ChatRequest, Error, Result};

/// One token per whitespace-separated word
#[derive(Default)]
pub struct WordCodec {
    vocab: Mutex<(HashMap<String, u32>, Vec<String>)>,
}

impl TokenCodec for WordCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut vocab = self.vocab.lock();
        Ok(text
            .split_whitespace()
            .map(|word| {
                if let Some(id) = vocab.0.get(word) {
                    return *id;
                }
                let id = vocab.1.len() as u32;
                vocab.1.push(word.to_string());
                vocab.0.insert(word.to_string(), id);
                id
            })
            .collect())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        let vocab = self.vocab.lock();
        tokens
            .iter()
            .map(|id| {
                vocab
                    .1
                    .get(*id as usize)
                    .cloned()
                    .ok_or_else(|| Error::extraction(format!("unknown token {}", id)))
            })
            .collect::<Result<Vec<_>>>()
            .map(|words| words.join(" "))
    }
}

/// Bag-of-words vectors: each lowercased word adds 1 to a hashed bucket
pub struct HashEmbedder {
    id: String,
    dimensions: usize,
}

impl EmbeddingModel for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimensions];
                for word in text.split_whitespace() {
                    let word = word.to_lowercase();
                    let hash = word
                        .bytes()
                        .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
                    vector[hash as usize % self.dimensions] += 1.0;
                }
                vector
            })
            .collect())
    }
}

/// Loads `hash-N` models with `N` dimensions (64 when there is no suffix).
///
/// Ids starting with `fail-` never load; ids starting with `slow-` stall for an hour.
#[derive(Default)]
pub struct HashLoader {
    pub loads: AtomicUsize,
}

#[async_trait]
impl ModelLoader for HashLoader {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn EmbeddingModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if model_id.starts_with("fail-") {
            return Err(Error::embedding(format!("Failed to load model {}", model_id)));
        }
        if model_id.starts_with("slow-") {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
        let dimensions = model_id
            .rsplit('-')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(64);
        Ok(Arc::new(HashEmbedder {
            id: model_id.to_string(),
            dimensions,
        }))
    }
}

/// Treats the stored upload as UTF-8 text
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::extraction(e.to_string()))?;
        Ok(normalize_whitespace(&text))
    }
}

pub struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        Err(Error::extraction(format!("cannot parse {}", path.display())))
    }
}

/// Records every call and echoes the first context line back as the answer
pub struct EchoChat {
    kind: ProviderKind,
    pub calls: Mutex<Vec<String>>,
}

impl EchoChat {
    pub fn new(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatProvider for EchoChat {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn chat_complete(
        &self,
        _system: &str,
        user: &str,
        _model: &str,
        _api_key: &str,
        _params: &GenerationParams,
    ) -> std::result::Result<String, ProviderError> {
        self.calls.lock().push(user.to_string());
        let first_line = user
            .strip_prefix("Context: ")
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default();
        Ok(format!("  {}  ", first_line))
    }
}

pub struct Harness {
    pub manager: Arc<DocumentManager>,
    pub loader: Arc<HashLoader>,
    pub openai: Arc<EchoChat>,
    pub huggingface: Arc<EchoChat>,
    pub storage: DocumentStorage,
    pub dir: tempfile::TempDir,
}

pub async fn harness() -> Harness {
    harness_with(Arc::new(PlainTextExtractor)).await
}

/// Manager over temp dirs with 8-token windows overlapping by 2
pub async fn harness_with(extractor: Arc<dyn TextExtractor>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = DocumentStorage::new(dir.path().join("uploads"), dir.path().join("indexes"));
    storage.ensure_dirs().await.unwrap();

    let pool = ComputePool::new(2);
    let loader = Arc::new(HashLoader::default());
    let embeddings = Arc::new(EmbeddingProvider::new(loader.clone(), pool.clone()));
    let chunker = Chunker::new(Arc::new(WordCodec::default()), 8, 2).unwrap();

    let openai = EchoChat::new(ProviderKind::OpenAi);
    let huggingface = EchoChat::new(ProviderKind::HuggingFace);
    let generator = AnswerGenerator::new(openai.clone(), huggingface.clone(), GenerationParams::default());

    let manager = Arc::new(DocumentManager::new(
        storage.clone(),
        extractor,
        chunker,
        embeddings,
        generator,
        pool,
    ));

    Harness {
        manager,
        loader,
        openai,
        huggingface,
        storage,
        dir,
    }
}

/// Three clearly separated topics, long enough for several windows each
pub const SAMPLE_TEXT: &str = "\
    The volcano erupted lava and ash over the island village for three days. \
    Penguins huddle together on the Antarctic ice to survive the winter storms. \
    The compiler rejected the program because the borrow checker found aliasing.";

pub fn chat_request(document_id: &str, query: &str, top_k: usize) -> ChatRequest {
    ChatRequest {
        document_id: document_id.to_string(),
        query: query.to_string(),
        top_k,
        provider: "openai".to_string(),
        llm_model: "gpt-4o-mini".to_string(),
        api_key: "sk-test".to_string(),
    }
}

/// Number of regular files in `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).filter(|e| e.path().is_file()).count())
        .unwrap_or(0)
}
