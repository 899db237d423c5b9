use pipeline_core::NodeConfig;

use crate::capability::NodeCapability;
use crate::state::ContextState;

pub struct TextInputCapability;

impl NodeCapability for TextInputCapability {
    /// Contributes the user-typed text; a blank box contributes nothing.
    fn context(&self, config: &NodeConfig, node_id: &str, state: &ContextState) -> Option<String> {
        if !matches!(config, NodeConfig::TextInput(_)) {
            return None;
        }

        let content = state.user_inputs.get(node_id)?.trim();
        if content.is_empty() {
            return None;
        }
        Some(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pipeline_core::TextInputConfig;

    use super::*;

    #[test]
    fn blank_input_contributes_nothing() {
        let config = NodeConfig::TextInput(TextInputConfig::default());
        let mut state = ContextState::default();
        assert_eq!(TextInputCapability.context(&config, "t1", &state), None);

        state.user_inputs.insert("t1".to_string(), "   ".to_string());
        assert_eq!(TextInputCapability.context(&config, "t1", &state), None);

        state.user_inputs.insert("t1".to_string(), " Be formal. ".to_string());
        assert_eq!(
            TextInputCapability.context(&config, "t1", &state),
            Some("Be formal.".to_string())
        );
    }
}
