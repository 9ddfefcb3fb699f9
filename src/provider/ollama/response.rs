//! Ollama API response structures

use serde::Deserialize;

use crate::provider::{LlmStreamChunk, LlmUsage};

/// Parse an Ollama streaming event into stream chunks
pub fn parse_ollama_event(event: OllamaStreamResponse) -> Vec<LlmStreamChunk> {
    let mut chunks = Vec::with_capacity(1);
    if let Some(thinking) = event.message.thinking.filter(|t| !t.is_empty()) {
        chunks.push(LlmStreamChunk::Thinking(thinking));
    }
    if !event.message.content.is_empty() {
        chunks.push(LlmStreamChunk::Text(event.message.content));
    }
    if event.done && (event.prompt_eval_count.is_some() || event.eval_count.is_some()) {
        chunks.push(LlmStreamChunk::Usage(LlmUsage {
            input_tokens: event.prompt_eval_count,
            output_tokens: event.eval_count,
        }));
    }

    chunks
}

/// Ollama chat response (streaming)
#[derive(Debug, Deserialize)]
pub struct OllamaStreamResponse {
    #[serde(default)]
    pub message: OllamaMessage,
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// Ollama message in response
#[derive(Debug, Default, Deserialize)]
pub struct OllamaMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Ollama embedding response
#[derive(Debug, Deserialize)]
pub struct OllamaEmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}
