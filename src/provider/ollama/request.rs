//! Ollama API request structures

use serde::Serialize;

use crate::provider::{LlmMessage, LlmRole};

/// Convert conversation messages to Ollama messages
pub fn build_ollama_messages(messages: &[LlmMessage]) -> Vec<OllamaMessage<'_>> {
    messages
        .iter()
        .map(|msg| OllamaMessage {
            role: match msg.role {
                LlmRole::System => "system",
                LlmRole::User => "user",
                LlmRole::Assistant => "assistant",
            },
            content: &msg.content,
        })
        .collect()
}

/// Ollama chat request structure
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OllamaMessage<'a>>,
    pub stream: bool,
    /// Reasoning models return their thinking separately when set, and skip it when unset
    pub think: bool,
}

/// Ollama chat message
#[derive(Debug, Serialize)]
pub struct OllamaMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Ollama embedding request
#[derive(Debug, Serialize)]
pub struct OllamaEmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}
