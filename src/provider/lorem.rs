use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use rocket::{async_trait, futures::Stream};
use tokio::time::{interval, Interval};

use crate::provider::{
    LlmApiProvider, LlmError, LlmMessage, LlmProviderOptions, LlmStream, LlmStreamChunk,
};

const LOREM_WORDS: [&str; 12] = [
    "Lorem ipsum ",
    "dolor sit ",
    "amet, consectetur ",
    "adipiscing elit, ",
    "sed do",
    " eiusmod tempor",
    " incididunt ut",
    " labore et",
    " dolore magna ",
    "aliqua. Ut ",
    "enim ad ",
    "minim veniam.",
];

/// A test/dummy runtime that streams 'lorem ipsum...'
pub struct LoremProvider {
    pub interval_ms: u64,
}

impl Default for LoremProvider {
    fn default() -> Self {
        Self { interval_ms: 50 }
    }
}

struct LoremStream {
    chunks: Vec<LlmStreamChunk>,
    interval: Interval,
}

impl Stream for LoremStream {
    type Item = Result<LlmStreamChunk, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.chunks.is_empty() {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.interval).poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Ok(self.chunks.remove(0)))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[async_trait]
impl LlmApiProvider for LoremProvider {
    async fn chat_stream(
        &self,
        _messages: Vec<LlmMessage>,
        options: &LlmProviderOptions,
    ) -> Result<LlmStream, LlmError> {
        let mut chunks = Vec::with_capacity(LOREM_WORDS.len() + 1);
        if options.think {
            chunks.push(LlmStreamChunk::Thinking("Thinking in latin...".to_owned()));
        }
        chunks.extend(
            LOREM_WORDS
                .iter()
                .map(|word| LlmStreamChunk::Text((*word).to_owned())),
        );

        Ok(Box::pin(LoremStream {
            chunks,
            interval: interval(Duration::from_millis(self.interval_ms.max(1))),
        }))
    }
}
