//! SSE response -> [`LLMStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{LLMError, LLMStream, Result};
use crate::types::LLMChunk;

/// Convert an SSE HTTP [`Response`] into an [`LLMStream`].
///
/// `handler` receives each event's name and data payload and can emit a
/// chunk (`Ok(Some(_))`), skip the event (`Ok(None)`), or fail the stream
/// (`Err(_)`, surfaced as [`LLMError::Stream`]).
pub fn chunk_stream_from_sse<H>(response: Response, mut handler: H) -> LLMStream
where
    H: FnMut(&str, &str) -> Result<Option<LLMChunk>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LLMError::Stream(e.to_string()))?;
            handler(event.event.as_str(), event.data.as_str())
                .map_err(|e| LLMError::Stream(e.to_string()))
        })
        .filter_map(|result| async move {
            match result {
                Ok(Some(chunk)) => Some(Ok(chunk)),
                Ok(None) => None,
                Err(err) => Some(Err(err)),
            }
        });

    Box::pin(stream)
}
