use serde::Deserialize;

use crate::provider::{LlmStreamChunk, LlmUsage};

/// Parse chunks from an OpenAI SSE event
pub fn parse_openai_event(mut event: OpenAIStreamResponse) -> Vec<LlmStreamChunk> {
    let mut chunks = Vec::with_capacity(1);
    if let Some(delta) = event.choices.pop().and_then(|c| c.delta) {
        // DeepSeek-style reasoning models stream their thinking separately
        if let Some(reasoning) = delta.reasoning_content.filter(|r| !r.is_empty()) {
            chunks.push(LlmStreamChunk::Thinking(reasoning));
        }
        if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
            chunks.push(LlmStreamChunk::Text(text));
        }
    }
    if let Some(usage) = event.usage {
        chunks.push(LlmStreamChunk::Usage(usage.into()));
    }

    chunks
}

/// OpenAI API streaming response
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

/// OpenAI API response choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub delta: Option<OpenAIResponseDelta>,
}

/// OpenAI API streaming delta
#[derive(Debug, Deserialize)]
pub struct OpenAIResponseDelta {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
}

/// OpenAI API usage
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl From<OpenAIUsage> for LlmUsage {
    fn from(usage: OpenAIUsage) -> Self {
        LlmUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }
    }
}
