use serde::{Deserialize, Serialize};

use pipeline_core::{ToolChoice, ToolDescriptor, ToolInvocation};

/// Base64 image payload attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// e.g. "image/png", "image/jpeg".
    pub media_type: String,
    /// Base64 data without any data-URL prefix.
    pub data: String,
}

/// A single-turn request: one system prompt, one user message, optional
/// tools and image attachments.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolDescriptor>,
    pub tool_choice: Option<ToolChoice>,
    pub images: Vec<ImageAttachment>,
}

/// Parsed model reply: accumulated text plus any tool invocations, in the
/// order the model emitted them.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub tool_uses: Vec<ToolInvocation>,
}

/// Incremental unit of a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum LLMChunk {
    Token(String),
    Done,
}
