use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::types::{Completion, CompletionRequest, LLMChunk};

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

pub type LLMStream = Pin<Box<dyn Stream<Item = Result<LLMChunk>> + Send>>;

/// One model-provider exchange.
///
/// `complete` is the request/response path used whenever tools or images
/// are present (neither is safely streamable token-by-token). `stream`
/// yields incremental text chunks and is only valid for plain-text
/// requests; the stream ends with an explicit [`LLMChunk::Done`], and a
/// connection that drops without one is a failure, not a short success.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    async fn stream(&self, request: &CompletionRequest) -> Result<LLMStream>;
}
