//! Read-only snapshots of pipeline state used during prompt assembly.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use pipeline_core::{GenieConversation, NodeType, PipelineStore, UrlContext};

/// The store shared between the runner, the genie engine and the URL
/// loader. Concurrent completions lock it per mutation, so updates apply
/// as sequential whole-value replacements.
pub type SharedStore = Arc<Mutex<PipelineStore>>;

/// Immutable snapshot of everything the context builder may read: genie
/// conversations, cached URL fetches, user inputs and prior outputs.
/// Assembling from a snapshot keeps [`crate::build_system_prompt`] a pure
/// function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct ContextState {
    pub genie_conversations: HashMap<String, GenieConversation>,
    pub url_contexts: HashMap<String, UrlContext>,
    pub user_inputs: HashMap<String, String>,
    pub outputs: HashMap<String, Value>,
    /// Raw stored drawings, keyed by paint node id.
    pub paint_images: HashMap<String, Value>,
}

pub const GENIE_CONVERSATION_KEY: &str = "genie:conversation";
pub const GENIE_BACKSTORY_UPDATE_KEY: &str = "genie:backstoryUpdate";
pub const URL_CONTEXT_KEY: &str = "url:context";
pub const PAINT_IMAGE_KEY: &str = "paint:image";

impl ContextState {
    pub fn snapshot(store: &PipelineStore) -> Self {
        let mut state = ContextState {
            user_inputs: store.user_inputs().clone(),
            outputs: store.outputs().clone(),
            ..Default::default()
        };

        for node in store.nodes() {
            match node.node_type() {
                NodeType::Genie => {
                    if let Some(conversation) = genie_conversation(store, &node.id) {
                        state.genie_conversations.insert(node.id.clone(), conversation);
                    }
                }
                NodeType::UrlLoader => {
                    if let Some(context) = url_context(store, &node.id) {
                        state.url_contexts.insert(node.id.clone(), context);
                    }
                }
                NodeType::Paint => {
                    if let Some(image) = store.node_state(&node.id, PAINT_IMAGE_KEY) {
                        state.paint_images.insert(node.id.clone(), image.clone());
                    }
                }
                _ => {}
            }
        }

        state
    }
}

/// Typed view of the `genie:conversation` node-state entry. Malformed
/// state reads as absent.
pub fn genie_conversation(store: &PipelineStore, node_id: &str) -> Option<GenieConversation> {
    store
        .node_state(node_id, GENIE_CONVERSATION_KEY)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

pub fn url_context(store: &PipelineStore, node_id: &str) -> Option<UrlContext> {
    store
        .node_state(node_id, URL_CONTEXT_KEY)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}
