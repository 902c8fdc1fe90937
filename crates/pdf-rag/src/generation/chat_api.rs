//! Client for OpenAI-compatible `/chat/completions` endpoints with retry

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use super::provider::{GenerationParams, ProviderError};
use crate::config::LlmConfig;
use crate::error::Result;

/// Parsed error payload of a failed call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub code: Option<String>,
    pub error_type: Option<String>,
}

/// Maps an HTTP failure to a typed provider error
pub type Classifier = fn(StatusCode, ErrorDetail) -> ProviderError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for one chat-completions base URL
#[derive(Clone)]
pub struct ChatApiClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ChatApiClient {
    /// Create a client with the timeout and retry policy from `config`
    pub fn new(base_url: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one completion, retrying transient failures with exponential backoff
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        model: &str,
        api_key: &str,
        params: &GenerationParams,
        classify: Classifier,
    ) -> std::result::Result<String, ProviderError> {
        let request = ChatRequest {
            model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let mut attempt = 0u32;
        loop {
            match self.send_once(&request, api_key, classify).await {
                Ok(answer) => return Ok(answer),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_backoff * 2u32.pow(attempt);
                    tracing::warn!(
                        "Chat request to {} failed (attempt {}/{}): {}; retrying in {:?}",
                        self.base_url,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        request: &ChatRequest<'_>,
        api_key: &str,
        classify: Classifier,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, parse_error_body(&body)));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Opaque(format!("Invalid completion response: {}", e))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Opaque("Completion contained no answer".to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Transport(e.to_string())
    }
}

/// Extract message/code/type from `{"error": {...}}`, `{"error": "..."}`
/// or `{"message": "..."}` bodies; anything else is kept verbatim
pub fn parse_error_body(body: &str) -> ErrorDetail {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            return ErrorDetail {
                message: body.trim().to_string(),
                ..Default::default()
            }
        }
    };

    let as_string = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    match value.get("error") {
        Some(serde_json::Value::Object(error)) => ErrorDetail {
            message: error
                .get("message")
                .and_then(as_string)
                .unwrap_or_else(|| body.trim().to_string()),
            code: error.get("code").and_then(as_string),
            error_type: error.get("type").and_then(as_string),
        },
        Some(serde_json::Value::String(message)) => ErrorDetail {
            message: message.clone(),
            ..Default::default()
        },
        _ => ErrorDetail {
            message: value
                .get("message")
                .and_then(as_string)
                .unwrap_or_else(|| body.trim().to_string()),
            ..Default::default()
        },
    }
}

/// Status-based classification shared by OpenAI-compatible backends
pub fn classify_status(status: StatusCode, detail: ErrorDetail) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail.message),
        StatusCode::NOT_FOUND => ProviderError::Model(detail.message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout(detail.message)
        }
        s if s.is_server_error() => ProviderError::Unavailable {
            status: s.as_u16(),
            message: detail.message,
        },
        _ => ProviderError::Opaque(detail.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_error_shape() {
        let detail = parse_error_body(
            r#"{"error":{"message":"The model `x` does not exist","type":"invalid_request_error","code":"model_not_found"}}"#,
        );
        assert_eq!(detail.message, "The model `x` does not exist");
        assert_eq!(detail.code.as_deref(), Some("model_not_found"));
        assert_eq!(detail.error_type.as_deref(), Some("invalid_request_error"));
    }

    #[test]
    fn test_parse_flat_and_plain_bodies() {
        assert_eq!(parse_error_body(r#"{"error":"Model is loading"}"#).message, "Model is loading");
        assert_eq!(parse_error_body(r#"{"message":"bad key"}"#).message, "bad key");
        assert_eq!(parse_error_body("  Bad Gateway ").message, "Bad Gateway");
    }

    #[test]
    fn test_status_classification() {
        let detail = || ErrorDetail {
            message: "m".into(),
            ..Default::default()
        };
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, detail()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, detail()),
            ProviderError::Unavailable { status: 502, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, detail()),
            ProviderError::Opaque(_)
        ));
    }
}
