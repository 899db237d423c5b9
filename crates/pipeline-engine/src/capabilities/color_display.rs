use pipeline_core::{NodeConfig, NodeType};

use crate::capability::NodeCapability;
use crate::state::ContextState;
use crate::synth::display_tool_name;

pub struct ColorDisplayCapability;

impl NodeCapability for ColorDisplayCapability {
    fn meta(&self, config: &NodeConfig, node_id: &str) -> String {
        let NodeConfig::ColorDisplay(config) = config else {
            return String::new();
        };

        let Some(tool_name) =
            display_tool_name(NodeType::ColorDisplay, config.name.as_deref())
        else {
            return String::new();
        };
        let label = config.label.as_deref().unwrap_or("color display");

        format!(
            "Available output block:\n\
             - \"{label}\": {node_id}, tool: {tool_name}\n\n\
             To show a color in this block, call the {tool_name} tool with a hex value \
             (e.g. \"#ff8800\") and optionally a color name and a short explanation."
        )
    }

    fn context(&self, _config: &NodeConfig, _node_id: &str, _state: &ContextState) -> Option<String> {
        None
    }
}
