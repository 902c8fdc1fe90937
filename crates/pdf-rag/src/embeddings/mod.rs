//! Embedding models and the per-process model cache

mod hub;
mod onnx_embedder;

pub use hub::HubClient;
pub use onnx_embedder::{OnnxEmbedder, OnnxModelLoader};

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::processing::ComputePool;

/// A loaded embedding model
pub trait EmbeddingModel: Send + Sync {
    /// Identifier the model was loaded under
    fn model_id(&self) -> &str;

    /// Output dimensionality
    fn dimensions(&self) -> usize;

    /// Raw (not necessarily normalized) embeddings, one row per input text.
    /// Called from a blocking thread.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Loads a model by identifier
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn EmbeddingModel>>;
}

type ModelSlot = Arc<OnceCell<Arc<dyn EmbeddingModel>>>;

/// Embeds texts with lazily loaded, cached models.
///
/// Each model id has one slot; the first caller performs the load and
/// concurrent callers for the same id await that load. A failed load leaves
/// the slot empty so the next call retries.
pub struct EmbeddingProvider {
    loader: Arc<dyn ModelLoader>,
    models: DashMap<String, ModelSlot>,
    pool: ComputePool,
}

impl EmbeddingProvider {
    /// Create a provider loading models through `loader`
    pub fn new(loader: Arc<dyn ModelLoader>, pool: ComputePool) -> Self {
        Self {
            loader,
            models: DashMap::new(),
            pool,
        }
    }

    /// Get a loaded model, loading it on first use
    pub async fn model(&self, model_id: &str) -> Result<Arc<dyn EmbeddingModel>> {
        if model_id.trim().is_empty() {
            return Err(Error::Config("Embedding model name is required".to_string()));
        }

        let slot: ModelSlot = self.models.entry(model_id.to_string()).or_default().clone();

        let model = slot
            .get_or_try_init(|| async {
                tracing::info!("Loading embedding model: {}", model_id);
                let model = self.loader.load(model_id).await?;
                tracing::info!(
                    "Embedding model {} loaded ({} dimensions)",
                    model_id,
                    model.dimensions()
                );
                Ok::<_, Error>(model)
            })
            .await?;

        Ok(Arc::clone(model))
    }

    /// Embed texts with `model_id`; every returned row has unit Euclidean norm.
    ///
    /// Chunks and queries both go through here, so a query vector is always
    /// produced exactly like the index rows it is compared with.
    pub async fn embed(&self, texts: &[String], model_id: &str) -> Result<Vec<Vec<f32>>> {
        let model = self.model(model_id).await?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected_rows = texts.len();
        let dimensions = model.dimensions();
        let texts = texts.to_vec();

        let mut vectors = self.pool.run(move || model.encode(&texts)).await??;

        if vectors.len() != expected_rows {
            return Err(Error::embedding(format!(
                "Model {} returned {} embeddings for {} texts",
                model_id,
                vectors.len(),
                expected_rows
            )));
        }
        for vector in &mut vectors {
            if vector.len() != dimensions {
                return Err(Error::embedding(format!(
                    "Model {} returned a {}-dimensional embedding, expected {}",
                    model_id,
                    vector.len(),
                    dimensions
                )));
            }
            normalize_l2(vector);
        }

        Ok(vectors)
    }

    /// Embed a single query text
    pub async fn embed_query(&self, query: &str, model_id: &str) -> Result<Vec<f32>> {
        self.embed(&[query.to_string()], model_id)
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    /// Identifiers of models that finished loading
    pub fn loaded_models(&self) -> Vec<String> {
        self.models
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drop every cached model
    pub fn clear(&self) {
        self.models.clear();
    }
}

/// Scale a vector to unit Euclidean norm; an all-zero vector is left as is
pub fn normalize_l2(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ConstantModel {
        id: String,
    }

    impl EmbeddingModel for ConstantModel {
        fn model_id(&self) -> &str {
            &self.id
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 2.0, 2.0])
                .collect())
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self, model_id: &str) -> Result<Arc<dyn EmbeddingModel>> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            if self.fail_first && attempt == 0 {
                return Err(Error::embedding("flaky load"));
            }
            Ok(Arc::new(ConstantModel {
                id: model_id.to_string(),
            }))
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let loader = Arc::new(CountingLoader::default());
        let provider = Arc::new(EmbeddingProvider::new(loader.clone(), ComputePool::new(2)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.model("m1").await.map(|m| m.dimensions()) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 3);
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(provider.loaded_models(), vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            ..Default::default()
        });
        let provider = EmbeddingProvider::new(loader.clone(), ComputePool::new(1));

        assert!(provider.model("m1").await.is_err());
        assert!(provider.model("m1").await.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_embed_rows_are_unit_norm() {
        let provider = EmbeddingProvider::new(Arc::new(CountingLoader::default()), ComputePool::new(1));
        let texts = vec!["a".to_string(), "longer text".to_string()];

        let vectors = provider.embed(&texts, "m1").await.unwrap();
        assert_eq!(vectors.len(), 2);
        for v in vectors {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_empty_model_id_is_config_error() {
        let provider = EmbeddingProvider::new(Arc::new(CountingLoader::default()), ComputePool::new(1));
        let result = provider.embed(&["x".to_string()], "  ").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0f32; 4];
        normalize_l2(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }
}
