//! HTTP chat adapters against a mock server

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pdf_rag::config::LlmConfig;
use pdf_rag::generation::{
    AnswerGenerator, ChatProvider, GenerationParams, HuggingFaceProvider, OpenAiProvider,
    ProviderError,
};
use pdf_rag::{Error, GenerationError};

fn llm_config() -> LlmConfig {
    LlmConfig {
        timeout_secs: 5,
        max_retries: 2,
        retry_backoff_ms: 1,
        ..Default::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

async fn openai(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::with_base_url(format!("{}/v1", server.uri()), &llm_config()).unwrap()
}

async fn huggingface(server: &MockServer) -> HuggingFaceProvider {
    HuggingFaceProvider::with_base_url(format!("{}/v1", server.uri()), &llm_config()).unwrap()
}

#[tokio::test]
async fn test_openai_completion_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(" The answer. ")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = openai(&server)
        .await
        .chat_complete("sys", "user", "gpt-4o-mini", "sk-test", &GenerationParams::default())
        .await
        .unwrap();
    assert_eq!(answer, " The answer. ");
}

#[tokio::test]
async fn test_generator_trims_remote_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("\n 42 \n")))
        .mount(&server)
        .await;

    let generator = AnswerGenerator::new(
        Arc::new(openai(&server).await),
        Arc::new(huggingface(&server).await),
        GenerationParams::default(),
    );
    let answer = generator
        .generate("q", &["ctx".to_string()], "huggingface", "Qwen/Qwen2.5-Coder-32B-Instruct", "hf_x")
        .await
        .unwrap();
    assert_eq!(answer, "42");
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached for gpt-4o", "type": "requests", "code": "rate_limit_exceeded" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = openai(&server)
        .await
        .chat_complete("s", "u", "gpt-4o", "sk", &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited(_)));
    assert_eq!(GenerationError::from(err), GenerationError::RateLimited);
}

#[tokio::test]
async fn test_unknown_model_is_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "message": "The model `gpt-9` does not exist or you do not have access to it.",
                "type": "invalid_request_error",
                "code": "model_not_found"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = AnswerGenerator::new(
        Arc::new(openai(&server).await),
        Arc::new(huggingface(&server).await),
        GenerationParams::default(),
    );
    let err = generator
        .generate("q", &[], "openai", "gpt-9", "sk")
        .await
        .unwrap_err();

    match err {
        Error::Generation(GenerationError::Model(message)) => assert!(message.contains("gpt-9")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Model meta-llama/Llama-3.2-3B-Instruct is currently loading"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = huggingface(&server)
        .await
        .chat_complete(
            "s",
            "u",
            "meta-llama/Llama-3.2-3B-Instruct",
            "hf_x",
            &GenerationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(answer, "ok");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(3)
        .mount(&server)
        .await;

    let err = openai(&server)
        .await
        .chat_complete("s", "u", "gpt-4o", "sk", &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable { status: 500, .. }));
    assert!(matches!(GenerationError::from(err), GenerationError::Failed(_)));
}

#[tokio::test]
async fn test_untyped_failures_use_message_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided: sk-bad.", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = openai(&server)
        .await
        .chat_complete("s", "u", "gpt-4o", "sk-bad", &GenerationParams::default())
        .await
        .unwrap_err();
    assert_eq!(
        GenerationError::from(err),
        GenerationError::Failed("Incorrect API key provided: sk-bad.".to_string())
    );
}

#[tokio::test]
async fn test_huggingface_unsupported_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "The requested model 'nobody/nothing' is not supported by any provider you have enabled."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = huggingface(&server)
        .await
        .chat_complete("s", "u", "nobody/nothing", "hf_x", &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Model(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_failure() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let provider = OpenAiProvider::with_base_url(uri, &llm_config()).unwrap();
    let err = provider
        .chat_complete("s", "u", "gpt-4o", "sk", &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(GenerationError::from(err), GenerationError::Failed(_)));
}
