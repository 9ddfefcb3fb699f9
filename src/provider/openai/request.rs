use serde::Serialize;

use crate::provider::{LlmMessage, LlmRole};

pub fn build_openai_messages(messages: &[LlmMessage]) -> Vec<OpenAIMessage<'_>> {
    messages
        .iter()
        .map(|message| OpenAIMessage {
            role: match message.role {
                LlmRole::System => "system",
                LlmRole::User => "user",
                LlmRole::Assistant => "assistant",
            },
            content: &message.content,
        })
        .collect()
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OpenAIMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<OpenAIStreamOptions>,
}

#[derive(Debug, Serialize)]
pub struct OpenAIStreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenAIMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}
