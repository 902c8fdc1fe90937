//! Answer generation through remote chat providers

mod chat_api;
mod generator;
mod huggingface;
mod openai;
pub mod prompt;
mod provider;

pub use chat_api::{parse_error_body, ChatApiClient, ErrorDetail};
pub use generator::AnswerGenerator;
pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAiProvider;
pub use prompt::PromptBuilder;
pub use provider::{
    classify_message, ChatProvider, GenerationParams, ProviderError, ProviderKind,
};
