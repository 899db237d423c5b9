use thiserror::Error;

use pipeline_llm::LLMError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node {0} is not an inference node")]
    NotAnInferenceNode(String),

    #[error("Node {0} is not a genie node")]
    NotAGenieNode(String),

    #[error("User message is required")]
    EmptyUserMessage,

    #[error("Gateway credentials are not configured")]
    NotConfigured,

    #[error("LLM error: {0}")]
    LLM(#[from] LLMError),

    #[error("State serialization error: {0}")]
    State(#[from] serde_json::Error),

    #[error("Streaming is unavailable when tools or images are present")]
    StreamingUnavailable,

    #[error("Stream ended without a done signal")]
    StreamTruncated,
}
