use pipeline_core::{ContextMode, NodeConfig};

use crate::capability::NodeCapability;
use crate::state::ContextState;

pub struct InferenceCapability;

impl NodeCapability for InferenceCapability {
    /// An earlier inference node's response feeds later context, unless
    /// the node is set to start fresh each run.
    fn context(&self, config: &NodeConfig, node_id: &str, state: &ContextState) -> Option<String> {
        let NodeConfig::Inference(config) = config else {
            return None;
        };
        if config.context_mode == ContextMode::Fresh {
            return None;
        }

        let output = state.outputs.get(node_id)?;
        let content = output.get("content").and_then(|c| c.as_str())?;
        if content.is_empty() {
            return None;
        }
        Some(format!("Previous response:\n{content}"))
    }
}
