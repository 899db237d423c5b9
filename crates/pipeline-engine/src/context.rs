//! Context assembly: one system prompt from an ordered node prefix.

use pipeline_core::{ChatRole, GenieConfig, GenieConversation, NodeConfig, NodeType, PipelineNode};

use crate::capability::global_registry;
use crate::state::ContextState;

#[derive(Debug, Clone)]
pub struct PromptOptions {
    /// Appended right after the root prompt, before any per-node content.
    /// Used to put a genie's own identity ahead of the shared context.
    pub additional_prompt: Option<String>,
    /// When false, genie conversations are left out entirely (their tool
    /// metadata still appears).
    pub include_genie_conversations: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            additional_prompt: None,
            include_genie_conversations: true,
        }
    }
}

/// Render a genie's memory the way the model sees it.
pub fn render_genie_block(config: &GenieConfig, conversation: &GenieConversation) -> String {
    let mut block = format!("Backstory: {}\n\nConversation:\n", config.backstory);
    for message in &conversation.messages {
        match message.role {
            ChatRole::User => {
                block.push_str("User: ");
            }
            _ => {
                block.push_str(config.display_name());
                block.push_str(": ");
            }
        }
        block.push_str(&message.content);
        block.push('\n');
    }
    block
}

/// Assemble the full system prompt for a target node from the ordered
/// prefix of nodes before it.
///
/// Fragment order mirrors node order exactly; that ordering is the
/// model's only signal of precedence among context pieces. Pure function
/// of its inputs: identical inputs give byte-identical output, and a node
/// with missing or malformed state contributes nothing rather than
/// aborting assembly.
pub fn build_system_prompt(
    root_prompt: &str,
    preceding_nodes: &[PipelineNode],
    state: &ContextState,
    options: &PromptOptions,
) -> String {
    let registry = global_registry();
    let mut fragments: Vec<String> = Vec::new();

    if !root_prompt.is_empty() {
        fragments.push(root_prompt.to_string());
    }

    if let Some(additional) = options.additional_prompt.as_deref() {
        if !additional.is_empty() {
            fragments.push(additional.to_string());
        }
    }

    for node in preceding_nodes {
        let node_type = node.node_type();
        // The root prompt already covers system prompt content.
        if node_type == NodeType::SystemPrompt {
            continue;
        }

        if let NodeConfig::Genie(config) = &node.config {
            if options.include_genie_conversations {
                if let Some(conversation) = state.genie_conversations.get(&node.id) {
                    if !conversation.is_empty() {
                        fragments.push(render_genie_block(config, conversation));
                    }
                }
            }
        } else if let Some(capability) = registry.get(node_type) {
            if let Some(content) = capability.context(&node.config, &node.id, state) {
                fragments.push(content);
            }
        }

        // Every node's tool metadata is appended regardless of type; this
        // is what tells the model which tools exist and how to call them.
        if let Some(capability) = registry.get(node_type) {
            let meta = capability.meta(&node.config, &node.id);
            if !meta.is_empty() {
                fragments.push(meta);
            }
        }
    }

    fragments.join("\n\n")
}
