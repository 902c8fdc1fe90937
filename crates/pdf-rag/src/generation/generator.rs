//! Provider-agnostic answer generation

use std::sync::Arc;

use super::prompt::PromptBuilder;
use super::provider::{ChatProvider, GenerationParams, ProviderKind};
use super::{HuggingFaceProvider, OpenAiProvider};
use crate::config::LlmConfig;
use crate::error::{Error, GenerationError, Result};

/// Builds the RAG prompt and sends it to the selected provider
pub struct AnswerGenerator {
    openai: Arc<dyn ChatProvider>,
    huggingface: Arc<dyn ChatProvider>,
    params: GenerationParams,
}

impl AnswerGenerator {
    pub fn new(
        openai: Arc<dyn ChatProvider>,
        huggingface: Arc<dyn ChatProvider>,
        params: GenerationParams,
    ) -> Self {
        Self {
            openai,
            huggingface,
            params,
        }
    }

    /// Production adapters for both providers
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(OpenAiProvider::new(config)?),
            Arc::new(HuggingFaceProvider::new(config)?),
            GenerationParams::from(config),
        ))
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn provider(&self, kind: ProviderKind) -> &Arc<dyn ChatProvider> {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::HuggingFace => &self.huggingface,
        }
    }

    /// Check caller-supplied generation settings without any remote call
    pub fn validate(provider: &str, model: &str, api_key: &str) -> Result<ProviderKind> {
        let kind: ProviderKind = provider.parse()?;
        if model.trim().is_empty() {
            return Err(Error::config("LLM model is required"));
        }
        if api_key.trim().is_empty() {
            return Err(Error::config("API key is required"));
        }
        Ok(kind)
    }

    /// Answer `query` from `context` (ranked chunk texts); the answer is trimmed
    pub async fn generate(
        &self,
        query: &str,
        context: &[String],
        provider: &str,
        model: &str,
        api_key: &str,
    ) -> Result<String> {
        let kind = Self::validate(provider, model, api_key)?;
        let user = PromptBuilder::user(query, context);

        tracing::info!(
            "Generating answer with {} model {} from {} chunks",
            kind,
            model,
            context.len()
        );

        let answer = self
            .provider(kind)
            .chat_complete(PromptBuilder::system(), &user, model, api_key, &self.params)
            .await
            .map_err(|e| {
                tracing::warn!("{} generation failed: {}", kind, e);
                Error::Generation(GenerationError::from(e))
            })?;

        Ok(answer.trim().to_string())
    }
}
