//! Text embeddings

use std::time::Duration;

use rocket::async_trait;

use crate::provider::{
    ollama::{OllamaEmbedRequest, OllamaEmbedResponse},
    utils::check_response,
    LlmError,
};

const EMBED_API_URL: &str = "/api/embed";

/// Turns texts into embedding vectors, one per input in order
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Embeddings from an Ollama runtime
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaEmbedder {
    pub fn new(http_client: &reqwest::Client, base_url: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            client: http_client.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self
            .client
            .post(format!("{}{}", self.base_url, EMBED_API_URL))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Embedding(format!("request failed: {}", e)))?;
        let response = check_response(response, "Ollama embed").await?;

        let body: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Embedding(format!("invalid response: {}", e)))?;
        if body.embeddings.len() != inputs.len() {
            return Err(LlmError::Embedding(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Embeds every input as a fixed-size vector derived from its length.
    /// Records the size of each request.
    pub struct FakeEmbedder {
        pub dimensions: usize,
        pub fail: bool,
        pub requests: Mutex<Vec<usize>>,
    }

    impl Default for FakeEmbedder {
        fn default() -> Self {
            Self {
                dimensions: 3,
                fail: false,
                requests: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            if self.fail {
                return Err(LlmError::Embedding("runtime unavailable".into()));
            }
            self.requests.lock().unwrap().push(inputs.len());
            Ok(inputs
                .iter()
                .map(|input| vec![input.len() as f32; self.dimensions])
                .collect())
        }
    }

    #[tokio::test]
    async fn empty_input_needs_no_request() {
        // Unroutable base URL: any request would fail
        let embedder = OllamaEmbedder::new(&reqwest::Client::new(), "http://127.0.0.1:9", "m", 1);
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }
}
