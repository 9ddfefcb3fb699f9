//! Chat model and embedding runtimes

pub mod embedding;
pub mod lorem;
pub mod ollama;
pub mod openai;
mod utils;

use std::pin::Pin;

use rocket::{async_trait, fairing::AdHoc, futures::Stream};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    config::get_app_config,
    db::models::LlmProviderType,
    provider::{lorem::LoremProvider, ollama::OllamaProvider, openai::OpenAIProvider},
};

pub use embedding::{EmbeddingProvider, OllamaEmbedder};

/// Model runtime errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Missing API key")]
    MissingApiKey,
    #[error("{0}")]
    ProviderError(String),
    #[error("Failed to decode stream: {0}")]
    Decoding(#[from] tokio_util::codec::LinesCodecError),
    #[error("Failed to parse response: {0}")]
    Parsing(#[from] serde_json::Error),
    #[error("No response from model")]
    NoResponse,
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Lorem ipsum error: {0}")]
    LoremError(&'static str),
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

/// A conversation message sent to the model. Also the format of the rolling history.
#[derive(Debug, Clone, PartialEq, Eq, JsonSchema, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

/// A streaming chunk of data from the model runtime
#[derive(Debug, PartialEq)]
pub enum LlmStreamChunk {
    Text(String),
    Thinking(String),
    Usage(LlmUsage),
}

/// Usage stats from the model runtime
#[derive(Debug, Clone, PartialEq, JsonSchema, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// Shared stream type for model runtimes
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmStreamChunk, LlmError>> + Send>>;

/// Options for a chat request
#[derive(Clone, Debug, Default)]
pub struct LlmProviderOptions {
    pub model: String,
    /// Ask reasoning models to emit their thinking
    pub think: bool,
}

/// Unified API for chat model runtimes
#[async_trait]
pub trait LlmApiProvider: Send + Sync {
    /// Stream a chat response
    async fn chat_stream(
        &self,
        messages: Vec<LlmMessage>,
        options: &LlmProviderOptions,
    ) -> Result<LlmStream, LlmError>;
}

/// Build the runtime client for a chat model config
pub fn build_llm_provider_api(
    provider_type: LlmProviderType,
    base_url: Option<&str>,
    api_key: Option<&str>,
    default_ollama_url: &str,
    http_client: &reqwest::Client,
) -> Result<Box<dyn LlmApiProvider>, LlmError> {
    match provider_type {
        LlmProviderType::Ollama => Ok(Box::new(OllamaProvider::new(
            http_client,
            base_url.unwrap_or(default_ollama_url),
        ))),
        LlmProviderType::Openai => Ok(Box::new(OpenAIProvider::new(
            http_client,
            api_key.ok_or(LlmError::MissingApiKey)?,
            base_url,
        ))),
        LlmProviderType::Lorem => Ok(Box::new(LoremProvider::default())),
    }
}

/// Fairing that sets up the shared HTTP client and the embedding runtime
pub fn setup_providers() -> AdHoc {
    AdHoc::try_on_ignite("Model runtimes", |rocket| async {
        let http_client = match reqwest::Client::builder().build() {
            Ok(client) => client,
            Err(e) => {
                rocket::error!("Failed to build HTTP client: {}", e);
                return Err(rocket);
            }
        };
        let app_config = get_app_config(&rocket);
        let embedder = OllamaEmbedder::new(
            &http_client,
            app_config.ollama_base_url(),
            app_config.embedding_model(),
            app_config.embedding_timeout(),
        );
        rocket::info!("Embedding model: {}", app_config.embedding_model());

        Ok(rocket.manage(http_client).manage(embedder))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_as_role_and_content() {
        let json = serde_json::to_value(LlmMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "hi" }));
    }

    #[test]
    fn openai_requires_api_key() {
        let client = reqwest::Client::new();
        let result = build_llm_provider_api(
            LlmProviderType::Openai,
            None,
            None,
            "http://localhost:11434",
            &client,
        );
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn ollama_and_lorem_need_no_key() {
        let client = reqwest::Client::new();
        for provider_type in [LlmProviderType::Ollama, LlmProviderType::Lorem] {
            assert!(
                build_llm_provider_api(provider_type, None, None, "http://localhost:11434", &client)
                    .is_ok()
            );
        }
    }
}
