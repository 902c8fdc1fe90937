//! HuggingFace Inference router (OpenAI-compatible)

use async_trait::async_trait;
use reqwest::StatusCode;

use super::chat_api::{classify_status, ChatApiClient, ErrorDetail};
use super::provider::{ChatProvider, GenerationParams, ProviderError, ProviderKind};
use crate::config::LlmConfig;
use crate::error::Result;

/// HuggingFace router `/v1/chat/completions` adapter
pub struct HuggingFaceProvider {
    api: ChatApiClient,
}

impl HuggingFaceProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_base_url(config.huggingface_base_url.clone(), config)
    }

    pub fn with_base_url(base_url: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            api: ChatApiClient::new(base_url, config)?,
        })
    }
}

fn classify(status: StatusCode, detail: ErrorDetail) -> ProviderError {
    let lowered = detail.message.to_lowercase();
    match status {
        // cold models answer 503 "... is currently loading"
        StatusCode::SERVICE_UNAVAILABLE if lowered.contains("loading") => {
            ProviderError::Unavailable {
                status: status.as_u16(),
                message: detail.message,
            }
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
            if lowered.contains("model") && lowered.contains("not") =>
        {
            ProviderError::Model(detail.message)
        }
        _ => classify_status(status, detail),
    }
}

#[async_trait]
impl ChatProvider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
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
