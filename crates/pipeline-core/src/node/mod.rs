pub mod config;
pub mod output;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use config::NodeConfig;

/// Id of the synthetic system prompt node that conceptually heads every
/// pipeline. It is never stored in the node list and never removable.
pub const FIXED_SYSTEM_PROMPT_ID: &str = "system-prompt-fixed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    SystemPrompt,
    UserInput,
    UrlLoader,
    TextInput,
    Paint,
    Inference,
    TextDisplay,
    ColorDisplay,
    IconDisplay,
    EmojiDisplay,
    GaugeDisplay,
    PixelArtDisplay,
    WebhookTrigger,
    Survey,
    Genie,
}

impl NodeType {
    /// Types that can receive structured output from the model via a
    /// synthesized tool.
    pub fn is_output_capable(&self) -> bool {
        matches!(
            self,
            NodeType::TextDisplay
                | NodeType::ColorDisplay
                | NodeType::IconDisplay
                | NodeType::EmojiDisplay
                | NodeType::GaugeDisplay
                | NodeType::PixelArtDisplay
                | NodeType::WebhookTrigger
                | NodeType::Survey
                | NodeType::Genie
        )
    }
}

/// One stage of the linear pipeline. Position in the containing list is the
/// pipeline's only topology: a node's context is exactly the list prefix
/// before it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineNode {
    pub id: String,
    #[serde(flatten)]
    pub config: NodeConfig,
}

impl PipelineNode {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
        }
    }

    pub fn with_id(id: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.config.node_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::config::{GenieConfig, TextInputConfig};

    #[test]
    fn node_serializes_with_sibling_type_tag() {
        let node = PipelineNode::with_id(
            "n1",
            NodeConfig::TextInput(TextInputConfig {
                label: Some("Notes".to_string()),
                placeholder: None,
            }),
        );

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "n1");
        assert_eq!(json["type"], "text_input");
        assert_eq!(json["config"]["label"], "Notes");
    }

    #[test]
    fn node_round_trips() {
        let node = PipelineNode::new(NodeConfig::Genie(GenieConfig {
            name: "sophia".to_string(),
            backstory: "A wise advisor.".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.7,
            auto_respond_on_update: Some(true),
        }));

        let json = serde_json::to_string(&node).unwrap();
        let back: PipelineNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, node.id);
        assert_eq!(back.node_type(), NodeType::Genie);
    }
}
