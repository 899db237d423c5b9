//! Per-node-type capability contract and registry.
//!
//! Each node type may describe its tool to the model (`meta`), contribute
//! content to the assembled context (`context`) and extract its piece of a
//! raw inference response (`parse`). A type with no registered capability
//! simply contributes nothing; none of the hooks may fail — malformed
//! config degrades to an empty contribution.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use pipeline_core::{InferenceResult, NodeConfig, NodeType};

use crate::capabilities;
use crate::state::ContextState;

/// Structured update extracted from a response by a capability's `parse`.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeUpdate {
    Genie(GenieUpdate),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenieUpdate {
    /// New persona text, from a backstory-update tool call or the
    /// deprecated text pattern.
    pub backstory: Option<String>,
    /// Inbound message addressed to the genie.
    pub message: Option<String>,
    pub should_auto_respond: bool,
}

pub trait NodeCapability: Send + Sync {
    /// Static text describing this node's tool to the model. Empty string
    /// means the node contributes no tool text.
    fn meta(&self, _config: &NodeConfig, _node_id: &str) -> String {
        String::new()
    }

    /// The node's content contribution, or `None` when it currently has
    /// nothing to say. Callers skip `None` silently.
    fn context(&self, _config: &NodeConfig, _node_id: &str, _state: &ContextState) -> Option<String> {
        None
    }

    /// Extract this node's relevant piece of the raw model response.
    fn parse(&self, _result: &InferenceResult, _node_id: &str) -> Option<NodeUpdate> {
        None
    }
}

pub type SharedCapability = Arc<dyn NodeCapability>;

pub struct CapabilityRegistry {
    capabilities: HashMap<NodeType, SharedCapability>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        let mut registry = Self {
            capabilities: HashMap::new(),
        };
        registry.register(NodeType::Genie, Arc::new(capabilities::GenieCapability));
        registry.register(
            NodeType::ColorDisplay,
            Arc::new(capabilities::ColorDisplayCapability),
        );
        registry.register(
            NodeType::IconDisplay,
            Arc::new(capabilities::IconDisplayCapability),
        );
        registry.register(NodeType::TextInput, Arc::new(capabilities::TextInputCapability));
        registry.register(NodeType::UrlLoader, Arc::new(capabilities::UrlLoaderCapability));
        registry.register(NodeType::Paint, Arc::new(capabilities::PaintCapability));
        registry.register(NodeType::Inference, Arc::new(capabilities::InferenceCapability));
        registry
    }
}

impl CapabilityRegistry {
    pub fn register(&mut self, node_type: NodeType, capability: SharedCapability) {
        self.capabilities.insert(node_type, capability);
    }

    pub fn get(&self, node_type: NodeType) -> Option<&dyn NodeCapability> {
        self.capabilities.get(&node_type).map(|c| c.as_ref())
    }

    pub fn registered_types(&self) -> Vec<NodeType> {
        self.capabilities.keys().copied().collect()
    }
}

static GLOBAL_REGISTRY: OnceLock<CapabilityRegistry> = OnceLock::new();

pub fn global_registry() -> &'static CapabilityRegistry {
    GLOBAL_REGISTRY.get_or_init(CapabilityRegistry::default)
}
