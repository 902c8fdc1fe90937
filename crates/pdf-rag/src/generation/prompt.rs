//! Prompt templates for answer generation

/// Instruction sent as the system message of every chat
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer concisely using only the provided context.";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// System message
    pub fn system() -> &'static str {
        SYSTEM_PROMPT
    }

    /// Join retrieved chunks into the context block, one per line, in rank order
    pub fn build_context<S: AsRef<str>>(chunks: &[S]) -> String {
        chunks
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// User message carrying the context and the question
    pub fn user<S: AsRef<str>>(query: &str, chunks: &[S]) -> String {
        format!(
            "Context: {}\n\nQuestion: {}\n\nAnswer:",
            Self::build_context(chunks),
            query
        )
    }
}
