pub mod config;
pub mod provider;
pub mod providers;
pub mod types;

pub use config::GatewayConfig;
pub use provider::{InferenceClient, LLMError, LLMStream, Result};
pub use providers::AnthropicProvider;
pub use types::{Completion, CompletionRequest, ImageAttachment, LLMChunk};
