pub mod anthropic;
pub mod common;

pub use anthropic::AnthropicProvider;
