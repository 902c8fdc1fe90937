//! Request types

use serde::{Deserialize, Serialize};

fn default_top_k() -> usize {
    5
}

/// Question about one uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub document_id: String,
    pub query: String,
    /// Number of chunks to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// `huggingface` or `openai`
    pub provider: String,
    pub llm_model: String,
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_defaults_to_five() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"document_id": "x", "query": "q", "provider": "openai", "llm_model": "gpt-4o", "api_key": "k"}"#,
        )
        .unwrap();
        assert_eq!(request.top_k, 5);
    }
}
