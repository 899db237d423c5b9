//! Per-node-type configuration variants.

use serde::{Deserialize, Serialize};

use super::NodeType;

/// Node configuration, tagged by the node type. Serialized adjacently so a
/// node appears on the wire as `{"type": "...", "config": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum NodeConfig {
    SystemPrompt(SystemPromptConfig),
    UserInput(UserInputConfig),
    UrlLoader(UrlLoaderConfig),
    TextInput(TextInputConfig),
    Paint(PaintConfig),
    Inference(InferenceConfig),
    TextDisplay(TextDisplayConfig),
    ColorDisplay(ColorDisplayConfig),
    IconDisplay(IconDisplayConfig),
    EmojiDisplay(EmojiDisplayConfig),
    GaugeDisplay(GaugeDisplayConfig),
    PixelArtDisplay(PixelArtDisplayConfig),
    WebhookTrigger(WebhookTriggerConfig),
    Survey(SurveyConfig),
    Genie(GenieConfig),
}

impl NodeConfig {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeConfig::SystemPrompt(_) => NodeType::SystemPrompt,
            NodeConfig::UserInput(_) => NodeType::UserInput,
            NodeConfig::UrlLoader(_) => NodeType::UrlLoader,
            NodeConfig::TextInput(_) => NodeType::TextInput,
            NodeConfig::Paint(_) => NodeType::Paint,
            NodeConfig::Inference(_) => NodeType::Inference,
            NodeConfig::TextDisplay(_) => NodeType::TextDisplay,
            NodeConfig::ColorDisplay(_) => NodeType::ColorDisplay,
            NodeConfig::IconDisplay(_) => NodeType::IconDisplay,
            NodeConfig::EmojiDisplay(_) => NodeType::EmojiDisplay,
            NodeConfig::GaugeDisplay(_) => NodeType::GaugeDisplay,
            NodeConfig::PixelArtDisplay(_) => NodeType::PixelArtDisplay,
            NodeConfig::WebhookTrigger(_) => NodeType::WebhookTrigger,
            NodeConfig::Survey(_) => NodeType::Survey,
            NodeConfig::Genie(_) => NodeType::Genie,
        }
    }

    /// User-supplied tool-name discriminator, where the type carries one.
    pub fn discriminator(&self) -> Option<&str> {
        let name = match self {
            NodeConfig::TextDisplay(c) => c.name.as_deref(),
            NodeConfig::ColorDisplay(c) => c.name.as_deref(),
            NodeConfig::IconDisplay(c) => c.name.as_deref(),
            NodeConfig::EmojiDisplay(c) => c.name.as_deref(),
            NodeConfig::GaugeDisplay(c) => c.name.as_deref(),
            NodeConfig::PixelArtDisplay(c) => c.name.as_deref(),
            NodeConfig::WebhookTrigger(c) => c.name.as_deref(),
            NodeConfig::Survey(c) => c.name.as_deref(),
            _ => None,
        };
        name.map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemPromptConfig {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlLoaderConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextInputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaintConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    #[default]
    Continue,
    Fresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub model: String,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub context_mode: ContextMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextDisplayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorDisplayConfig {
    /// Becomes part of the tool name (e.g. "mood" -> `display_mood_color`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_hex: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconSize {
    Sm,
    #[default]
    Md,
    Lg,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IconDisplayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<IconSize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmojiDisplayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeStyle {
    #[default]
    Bar,
    Dial,
    Number,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GaugeDisplayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<GaugeStyle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PixelArtDisplayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookTriggerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_response: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStyle {
    #[default]
    Buttons,
    Radio,
    Dropdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<SurveyStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenieConfig {
    /// The genie's display name (e.g. "luke", "sophia").
    pub name: String,
    /// Persona/instruction text. Editable by the user and updatable via a
    /// backstory-update tool call (or the deprecated text pattern).
    pub backstory: String,
    pub model: String,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_respond_on_update: Option<bool>,
}

impl GenieConfig {
    /// Display name used in prompt labels and tool names; defaults to
    /// "genie" when blank.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            "genie"
        } else {
            trimmed
        }
    }
}
