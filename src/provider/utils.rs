use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;
use tokio_stream::{Stream, StreamExt};
use tokio_util::{
    bytes::{Buf, Bytes},
    codec::{FramedRead, LinesCodec},
    io::StreamReader,
};

use crate::provider::LlmError;

const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Body of a runtime response as a stream of byte chunks
pub fn response_bytes(
    response: reqwest::Response,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send {
    response.bytes_stream().map_err(std::io::Error::other)
}

/// Deserialize `data: ` events of a server-sent event stream, skipping other
/// lines and the `[DONE]` marker.
pub fn sse_events<T, S, B>(byte_stream: S) -> impl Stream<Item = Result<T, LlmError>>
where
    T: DeserializeOwned,
    S: Stream<Item = std::io::Result<B>>,
    B: Buf,
{
    let line_reader = FramedRead::new(
        StreamReader::new(byte_stream),
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    );

    line_reader.filter_map(|line_result| match line_result {
        Ok(line) => {
            let data = line.strip_prefix("data:")?.trim();
            if data.is_empty() || data == "[DONE]" {
                None
            } else {
                Some(serde_json::from_str::<T>(data).map_err(LlmError::Parsing))
            }
        }
        Err(e) => Some(Err(LlmError::Decoding(e))),
    })
}

/// Deserialize a newline-delimited JSON stream, skipping blank lines
pub fn ndjson_events<T, S, B>(byte_stream: S) -> impl Stream<Item = Result<T, LlmError>>
where
    T: DeserializeOwned,
    S: Stream<Item = std::io::Result<B>>,
    B: Buf,
{
    let line_reader = FramedRead::new(
        StreamReader::new(byte_stream),
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    );

    line_reader.filter_map(|line_result| match line_result {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str::<T>(&line).map_err(LlmError::Parsing)),
        Err(e) => Some(Err(LlmError::Decoding(e))),
    })
}

/// Turn a non-success runtime response into an error with its body
pub async fn check_response(
    response: reqwest::Response,
    runtime: &str,
) -> Result<reqwest::Response, LlmError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(LlmError::ProviderError(format!(
        "{} API error {}: {}",
        runtime, status, error_text
    )))
}
