//! Ollama chat runtime

mod request;
mod response;

pub(crate) use request::OllamaEmbedRequest;
pub(crate) use response::OllamaEmbedResponse;

use rocket::{async_trait, futures::StreamExt};

use crate::provider::{
    ollama::{
        request::{build_ollama_messages, OllamaChatRequest},
        response::{parse_ollama_event, OllamaStreamResponse},
    },
    utils::{check_response, ndjson_events, response_bytes},
    LlmApiProvider, LlmError, LlmMessage, LlmProviderOptions, LlmStream,
};

const CHAT_API_URL: &str = "/api/chat";

/// Ollama chat provider
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(http_client: &reqwest::Client, base_url: &str) -> Self {
        Self {
            client: http_client.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn build_chat_request<'a>(
    messages: &'a [LlmMessage],
    options: &'a LlmProviderOptions,
) -> OllamaChatRequest<'a> {
    OllamaChatRequest {
        model: &options.model,
        messages: build_ollama_messages(messages),
        stream: true,
        think: options.think,
    }
}

#[async_trait]
impl LlmApiProvider for OllamaProvider {
    async fn chat_stream(
        &self,
        messages: Vec<LlmMessage>,
        options: &LlmProviderOptions,
    ) -> Result<LlmStream, LlmError> {
        let request = build_chat_request(&messages, options);

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_API_URL))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ProviderError(format!("Ollama request failed: {}", e)))?;
        let response = check_response(response, "Ollama").await?;

        let stream = async_stream::stream! {
            let events = ndjson_events::<OllamaStreamResponse, _, _>(response_bytes(response));
            let mut events = std::pin::pin!(events);
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        for chunk in parse_ollama_event(event) {
                            yield Ok(chunk);
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request_json(think: bool) -> serde_json::Value {
        let messages = vec![LlmMessage::user("hi")];
        let options = LlmProviderOptions {
            model: "qwen3".into(),
            think,
        };
        serde_json::to_value(build_chat_request(&messages, &options)).unwrap()
    }

    #[test]
    fn think_flag_is_always_sent() {
        assert_eq!(request_json(true)["think"], json!(true));
        assert_eq!(request_json(false)["think"], json!(false));
    }

    #[test]
    fn chat_request_streams_messages() {
        let request = request_json(false);
        assert_eq!(request["model"], json!("qwen3"));
        assert_eq!(request["stream"], json!(true));
        assert_eq!(request["messages"], json!([{ "role": "user", "content": "hi" }]));
        assert!(request.get("options").is_none());
    }
}
