use pipeline_core::{NodeConfig, NodeType, ICON_IDS};

use crate::capability::NodeCapability;
use crate::synth::display_tool_name;

pub struct IconDisplayCapability;

impl NodeCapability for IconDisplayCapability {
    fn meta(&self, config: &NodeConfig, node_id: &str) -> String {
        let NodeConfig::IconDisplay(config) = config else {
            return String::new();
        };

        let Some(tool_name) = display_tool_name(NodeType::IconDisplay, config.name.as_deref())
        else {
            return String::new();
        };
        let label = config.label.as_deref().unwrap_or("icon display");

        format!(
            "Available output block:\n\
             - \"{label}\": {node_id}, tool: {tool_name}\n\n\
             To show an icon in this block, call the {tool_name} tool with one of these \
             icon ids: {}.",
            ICON_IDS.join(", ")
        )
    }
}
