use pipeline_core::NodeConfig;

use crate::capability::NodeCapability;
use crate::state::ContextState;

pub struct UrlLoaderCapability;

impl NodeCapability for UrlLoaderCapability {
    /// Contributes the cached fetch result. A failed or empty fetch is
    /// treated exactly like "no contribution".
    fn context(&self, config: &NodeConfig, node_id: &str, state: &ContextState) -> Option<String> {
        if !matches!(config, NodeConfig::UrlLoader(_)) {
            return None;
        }

        let context = state.url_contexts.get(node_id)?;
        if context.error.is_some() || context.content.is_empty() {
            return None;
        }
        Some(format!("Source: {}\n\n{}", context.url, context.content))
    }
}
