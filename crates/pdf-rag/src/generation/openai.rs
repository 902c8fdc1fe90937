//! OpenAI chat completions

use async_trait::async_trait;
use reqwest::StatusCode;

use super::chat_api::{classify_status, ChatApiClient, ErrorDetail};
use super::provider::{ChatProvider, GenerationParams, ProviderError, ProviderKind};
use crate::config::LlmConfig;
use crate::error::Result;

/// OpenAI `/v1/chat/completions` adapter
pub struct OpenAiProvider {
    api: ChatApiClient,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_base_url(config.openai_base_url.clone(), config)
    }

    /// Point the adapter at another OpenAI-compatible endpoint
    pub fn with_base_url(base_url: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            api: ChatApiClient::new(base_url, config)?,
        })
    }
}

fn classify(status: StatusCode, detail: ErrorDetail) -> ProviderError {
    let model_not_found = detail.code.as_deref() == Some("model_not_found");
    match status {
        // quota exhaustion is reported as 429 as well
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail.message),
        _ if model_not_found => ProviderError::Model(detail.message),
        StatusCode::BAD_REQUEST if detail.message.to_lowercase().contains("model") => {
            ProviderError::Model(detail.message)
        }
        _ => classify_status(status, detail),
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn chat_complete(
        &self,
        system: &str,
        user: &str,
        model: &str,
        api_key: &str,
        params: &GenerationParams,
    ) -> std::result::Result<String, ProviderError> {
        self.api
            .complete(system, user, model, api_key, params, classify)
            .await
    }
}
