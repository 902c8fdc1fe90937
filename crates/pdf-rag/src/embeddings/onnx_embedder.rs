//! ONNX-based sentence embedding
//!
//! Models are sentence-transformer exports fetched from the hub: the graph
//! from `onnx/model.onnx` and the vocabulary from `tokenizer.json`.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};

use super::{EmbeddingModel, HubClient, ModelLoader};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

const MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// How token states are reduced to one sentence vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    /// Attention-masked mean over all tokens
    Mean,
    /// Hidden state of the first (`[CLS]`) token
    Cls,
}

impl Pooling {
    /// Pooling used by the sentence-transformers config of a model family
    pub fn for_model(model_id: &str) -> Self {
        let name = model_id.rsplit('/').next().unwrap_or(model_id);
        if name.starts_with("bge-") {
            Pooling::Cls
        } else {
            Pooling::Mean
        }
    }
}

/// Token limit from the sentence-transformers config of a model family
pub fn max_seq_length(model_id: &str) -> usize {
    let name = model_id.rsplit('/').next().unwrap_or(model_id);
    if name.starts_with("bge-") {
        512
    } else if name.contains("mpnet") {
        384
    } else {
        256
    }
}

/// Hub repository for a model name; bare names resolve the way
/// sentence-transformers does
pub fn hub_repo(model_id: &str) -> String {
    if model_id.contains('/') {
        model_id.to_string()
    } else if model_id.starts_with("bge-") {
        format!("BAAI/{}", model_id)
    } else {
        format!("sentence-transformers/{}", model_id)
    }
}

/// Loads [`OnnxEmbedder`]s through the hub cache
pub struct OnnxModelLoader {
    hub: HubClient,
    max_length: Option<usize>,
    batch_size: usize,
    intra_threads: usize,
}

impl OnnxModelLoader {
    pub fn new(hub: HubClient, config: &EmbeddingConfig) -> Self {
        Self {
            hub,
            max_length: config.max_length,
            batch_size: config.batch_size.max(1),
            intra_threads: config.intra_threads.max(1),
        }
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn EmbeddingModel>> {
        let repo = hub_repo(model_id);
        let model_path = self.hub.fetch(&repo, MODEL_FILE).await?;
        let tokenizer_path = self.hub.fetch(&repo, TOKENIZER_FILE).await?;

        let model_id = model_id.to_string();
        let max_length = self
            .max_length
            .unwrap_or_else(|| max_seq_length(&model_id));
        let (batch_size, intra_threads) = (self.batch_size, self.intra_threads);

        let embedder = tokio::task::spawn_blocking(move || {
            OnnxEmbedder::load(
                model_id,
                &model_path,
                &tokenizer_path,
                max_length,
                batch_size,
                intra_threads,
            )
        })
        .await
        .map_err(|e| Error::internal(format!("Model load task failed: {}", e)))??;

        Ok(Arc::new(embedder))
    }
}

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    model_id: String,
    /// ONNX Runtime session
    session: Mutex<Session>,
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Whether the graph declares a `token_type_ids` input
    uses_token_types: bool,
    pooling: Pooling,
    /// Embedding dimensions, read from the model output at load
    dimensions: usize,
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Build a session and tokenizer from local files. Blocking.
    pub fn load(
        model_id: String,
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
        batch_size: usize,
        intra_threads: usize,
    ) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| Error::embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(intra_threads)
            .map_err(|e| Error::embedding(format!("Failed to set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| Error::embedding(format!("Failed to load model {}: {}", model_id, e)))?;

        let uses_token_types = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| Error::embedding(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::embedding(format!("Failed to configure truncation: {}", e)))?;
        tokenizer.with_padding(None);

        let mut embedder = Self {
            pooling: Pooling::for_model(&model_id),
            model_id,
            session: Mutex::new(session),
            tokenizer,
            uses_token_types,
            dimensions: 0,
            batch_size: batch_size.max(1),
        };

        let sample = embedder.embed_batch(&["dimension check"])?;
        embedder.dimensions = sample.first().map(Vec::len).unwrap_or(0);
        if embedder.dimensions == 0 {
            return Err(Error::embedding(format!(
                "Model {} produced an empty embedding",
                embedder.model_id
            )));
        }

        Ok(embedder)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_batch_internal(batch)?);
        }
        Ok(all_embeddings)
    }

    fn embed_batch_internal(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let row = i * seq_len;
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len() {
                input_ids[row + j] = ids[j] as i64;
                attention_mask[row + j] = mask[j] as i64;
                token_type_ids[row + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, seq_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("Input tensor creation failed: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| {
                    Error::embedding(format!("Attention mask tensor creation failed: {}", e))
                })?;

        let mut inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
        ];
        if self.uses_token_types {
            let token_type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
                .map_err(|e| {
                    Error::embedding(format!("Token type tensor creation failed: {}", e))
                })?;
            inputs.push(("token_type_ids", token_type_tensor.into_dyn()));
        }

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| Error::embedding(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::embedding("No output tensor"))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = match dims.as_slice() {
            [b, s, h] if *b == batch_size && *s == seq_len => *h,
            _ => {
                return Err(Error::embedding(format!(
                    "Unexpected output shape {:?} for batch {}x{}",
                    dims, batch_size, seq_len
                )))
            }
        };

        Ok(pool_hidden_states(
            tensor_data,
            &attention_mask,
            batch_size,
            seq_len,
            hidden_size,
            self.pooling,
        ))
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.embed_batch(&texts)
    }
}

/// Reduce a `[batch, seq, hidden]` tensor to one vector per row
fn pool_hidden_states(
    data: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
    pooling: Pooling,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let base = i * seq_len * hidden_size;
        let pooled = match pooling {
            Pooling::Cls => data[base..base + hidden_size].to_vec(),
            Pooling::Mean => {
                let mut sum = vec![0.0f32; hidden_size];
                let mut count = 0.0f32;
                for j in 0..seq_len {
                    if attention_mask[i * seq_len + j] > 0 {
                        let offset = base + j * hidden_size;
                        for (k, val) in sum.iter_mut().enumerate() {
                            *val += data[offset + k];
                        }
                        count += 1.0;
                    }
                }
                if count > 0.0 {
                    for val in &mut sum {
                        *val /= count;
                    }
                }
                sum
            }
        };
        embeddings.push(pooled);
    }

    embeddings
}
