//! Static catalog of providers and models offered to clients

use serde::Serialize;
use std::collections::BTreeMap;

use crate::generation::ProviderKind;

/// A selectable model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub name: &'static str,
    pub description: &'static str,
}

const fn model(name: &'static str, description: &'static str) -> ModelInfo {
    ModelInfo { name, description }
}

pub const EMBEDDING_MODELS: &[ModelInfo] = &[
    model("sentence-transformers/all-MiniLM-L6-v2", "Fast, lightweight"),
    model("sentence-transformers/all-mpnet-base-v2", "Better quality"),
    model("BAAI/bge-small-en-v1.5", "High quality, small"),
    model("BAAI/bge-base-en-v1.5", "High quality, medium"),
];

pub const HUGGINGFACE_MODELS: &[ModelInfo] = &[
    model("Qwen/Qwen2.5-Coder-32B-Instruct", "Good for code"),
    model("meta-llama/Llama-3.2-3B-Instruct", "Fast, lightweight"),
    model("mistralai/Mistral-Nemo-Instruct-2407", "High quality"),
    model("microsoft/Phi-3.5-mini-instruct", "Compact, efficient"),
];

pub const OPENAI_MODELS: &[ModelInfo] = &[
    model("gpt-4o-mini", "Fast, affordable"),
    model("gpt-4o", "Most capable"),
    model("gpt-3.5-turbo", "Legacy, fast"),
];

/// Chat models listed for a provider
pub fn llm_models(provider: ProviderKind) -> &'static [ModelInfo] {
    match provider {
        ProviderKind::HuggingFace => HUGGINGFACE_MODELS,
        ProviderKind::OpenAi => OPENAI_MODELS,
    }
}

/// Body of `GET /config`
#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub supported_providers: Vec<&'static str>,
    pub embedding_models: &'static [ModelInfo],
    pub llm_models: BTreeMap<&'static str, &'static [ModelInfo]>,
}

impl CatalogResponse {
    pub fn build() -> Self {
        Self {
            supported_providers: ProviderKind::ALL.iter().map(|p| p.as_str()).collect(),
            embedding_models: EMBEDDING_MODELS,
            llm_models: ProviderKind::ALL
                .iter()
                .map(|p| (p.as_str(), llm_models(*p)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let json = serde_json::to_value(CatalogResponse::build()).unwrap();
        assert_eq!(json["supported_providers"], serde_json::json!(["huggingface", "openai"]));
        assert_eq!(json["embedding_models"].as_array().unwrap().len(), 4);
        assert_eq!(json["llm_models"]["openai"][0]["name"], "gpt-4o-mini");
        assert_eq!(json["llm_models"]["huggingface"].as_array().unwrap().len(), 4);
    }
}
