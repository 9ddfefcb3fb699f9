//! OpenAI-compatible chat runtime

mod request;
mod response;

use rocket::{async_trait, futures::StreamExt};

use crate::provider::{
    openai::{
        request::{build_openai_messages, OpenAIRequest, OpenAIStreamOptions},
        response::{parse_openai_event, OpenAIStreamResponse},
    },
    utils::{check_response, response_bytes, sse_events},
    LlmApiProvider, LlmError, LlmMessage, LlmProviderOptions, LlmStream,
};

const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(http_client: &reqwest::Client, api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            client: http_client.clone(),
            api_key: api_key.to_owned(),
            base_url: base_url
                .unwrap_or(OPENAI_API_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
        }
    }
}

#[async_trait]
impl LlmApiProvider for OpenAIProvider {
    async fn chat_stream(
        &self,
        messages: Vec<LlmMessage>,
        options: &LlmProviderOptions,
    ) -> Result<LlmStream, LlmError> {
        let request = OpenAIRequest {
            model: &options.model,
            messages: build_openai_messages(&messages),
            stream: true,
            stream_options: Some(OpenAIStreamOptions {
                include_usage: true,
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ProviderError(format!("OpenAI request failed: {}", e)))?;
        let response = check_response(response, "OpenAI").await?;

        let stream = async_stream::stream! {
            let events = sse_events::<OpenAIStreamResponse, _, _>(response_bytes(response));
            let mut events = std::pin::pin!(events);
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        for chunk in parse_openai_event(event) {
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
