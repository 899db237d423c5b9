pub mod conversation;
pub mod document;
pub mod error;
pub mod node;
pub mod store;
pub mod tools;

pub use conversation::{ChatRole, ConversationMessage, GenieConversation};
pub use document::PipelineDocument;
pub use error::PipelineError;
pub use node::config::{
    ColorDisplayConfig, EmojiDisplayConfig, GaugeDisplayConfig, GaugeStyle, GenieConfig,
    IconDisplayConfig, IconSize, InferenceConfig, ContextMode, NodeConfig, PaintConfig,
    PixelArtDisplayConfig, SurveyConfig, SurveyStyle, SystemPromptConfig, TextDisplayConfig,
    TextInputConfig, UrlLoaderConfig, UserInputConfig, WebhookTriggerConfig,
};
pub use node::output::{
    ColorOutput, EmojiOutput, GaugeOutput, IconOutput, PixelArtOutput, SurveyOption,
    SurveyOutput, TextOutput, UrlContext, WebhookOutput, ICON_IDS,
};
pub use node::{NodeType, PipelineNode, FIXED_SYSTEM_PROMPT_ID};
pub use store::{PersistHook, PipelineStore};
pub use tools::{InferenceResult, ToolChoice, ToolDescriptor, ToolInvocation};
