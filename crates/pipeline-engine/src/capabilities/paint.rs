use pipeline_core::NodeConfig;

use crate::capability::NodeCapability;
use crate::state::ContextState;

pub struct PaintCapability;

impl NodeCapability for PaintCapability {
    /// The drawing itself travels as an image attachment; the text context
    /// only carries a marker so the model knows where it came from.
    fn context(&self, config: &NodeConfig, node_id: &str, state: &ContextState) -> Option<String> {
        let NodeConfig::Paint(config) = config else {
            return None;
        };

        if !state.paint_images.contains_key(node_id) {
            return None;
        }

        let label = config.label.as_deref().unwrap_or("the paint canvas");
        Some(format!(
            "[An image drawn by the user on {label} is attached to this request.]"
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use pipeline_core::PaintConfig;

    use super::*;

    #[test]
    fn only_nodes_with_a_stored_drawing_contribute() {
        let config = NodeConfig::Paint(PaintConfig { label: None });
        let mut state = ContextState::default();
        assert_eq!(PaintCapability.context(&config, "p1", &state), None);

        state.paint_images.insert(
            "p1".to_string(),
            json!({"media_type": "image/png", "data": "aGVsbG8="}),
        );
        let marker = PaintCapability.context(&config, "p1", &state).unwrap();
        assert!(marker.contains("attached"));
    }
}
