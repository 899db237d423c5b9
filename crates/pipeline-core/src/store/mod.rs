//! The shared pipeline store.
//!
//! Owns the node list and the node-id-keyed runtime side tables. All
//! mutations are whole-value replacement per key (last write wins) and
//! each one notifies the injected persistence hook with a serializable
//! snapshot; debouncing is the hook's own policy.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::document::PipelineDocument;
use crate::node::config::{NodeConfig, SystemPromptConfig};
use crate::node::{PipelineNode, FIXED_SYSTEM_PROMPT_ID};

pub type PersistHook = Box<dyn Fn(&PipelineDocument) + Send + Sync>;

pub struct PipelineStore {
    system_prompt_config: SystemPromptConfig,
    nodes: Vec<PipelineNode>,
    outputs: HashMap<String, Value>,
    user_inputs: HashMap<String, String>,
    /// Node-type-specific extension state, keyed `"{nodeId}:{key}"`. Every
    /// key must be prefixed by a live node id.
    node_state: HashMap<String, Value>,
    /// Per-node in-flight flags. Never persisted.
    loading: HashSet<String>,
    persist: Option<PersistHook>,
}

impl Default for PipelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStore {
    pub fn new() -> Self {
        Self {
            system_prompt_config: SystemPromptConfig {
                prompt: "You are a helpful assistant.".to_string(),
            },
            nodes: Vec::new(),
            outputs: HashMap::new(),
            user_inputs: HashMap::new(),
            node_state: HashMap::new(),
            loading: HashSet::new(),
            persist: None,
        }
    }

    /// Install a persistence side effect, invoked after every mutation.
    pub fn with_persist_hook(mut self, hook: PersistHook) -> Self {
        self.persist = Some(hook);
        self
    }

    fn notify_persist(&self) {
        if let Some(hook) = &self.persist {
            hook(&self.document());
        }
    }

    // ---- system prompt ----

    pub fn system_prompt_config(&self) -> &SystemPromptConfig {
        &self.system_prompt_config
    }

    pub fn set_system_prompt_config(&mut self, config: SystemPromptConfig) {
        self.system_prompt_config = config;
        self.notify_persist();
    }

    // ---- nodes ----

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&PipelineNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == node_id)
    }

    pub fn add_node(&mut self, node: PipelineNode, insert_index: Option<usize>) {
        match insert_index {
            Some(index) if index <= self.nodes.len() => self.nodes.insert(index, node),
            _ => self.nodes.push(node),
        }
        self.notify_persist();
    }

    /// Remove a node and cascade-purge every piece of runtime state keyed
    /// by its id. The fixed system prompt node is not removable. Returns
    /// whether anything was removed.
    pub fn remove_node(&mut self, node_id: &str) -> bool {
        if node_id == FIXED_SYSTEM_PROMPT_ID {
            log::warn!("[{node_id}] refusing to remove the fixed system prompt node");
            return false;
        }

        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != node_id);
        if self.nodes.len() == before {
            return false;
        }

        self.outputs.remove(node_id);
        self.user_inputs.remove(node_id);
        let prefix = format!("{node_id}:");
        self.node_state.retain(|key, _| !key.starts_with(&prefix));
        self.loading.remove(node_id);

        self.notify_persist();
        true
    }

    /// Replace a node's config in place. The fixed node id routes to the
    /// system prompt config instead.
    pub fn update_config(&mut self, node_id: &str, config: NodeConfig) {
        if node_id == FIXED_SYSTEM_PROMPT_ID {
            if let NodeConfig::SystemPrompt(system) = config {
                self.system_prompt_config = system;
                self.notify_persist();
            }
            return;
        }

        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.config = config;
            self.notify_persist();
        }
    }

    pub fn reorder_nodes(&mut self, old_index: usize, new_index: usize) {
        if old_index >= self.nodes.len() || new_index >= self.nodes.len() {
            return;
        }
        let node = self.nodes.remove(old_index);
        self.nodes.insert(new_index, node);
        self.notify_persist();
    }

    // ---- outputs ----

    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.outputs.get(node_id)
    }

    pub fn outputs(&self) -> &HashMap<String, Value> {
        &self.outputs
    }

    pub fn set_output(&mut self, node_id: &str, output: Value) {
        self.outputs.insert(node_id.to_string(), output);
        self.notify_persist();
    }

    // ---- user inputs ----

    pub fn user_input(&self, node_id: &str) -> Option<&str> {
        self.user_inputs.get(node_id).map(String::as_str)
    }

    pub fn user_inputs(&self) -> &HashMap<String, String> {
        &self.user_inputs
    }

    pub fn set_user_input(&mut self, node_id: &str, value: impl Into<String>) {
        self.user_inputs.insert(node_id.to_string(), value.into());
        self.notify_persist();
    }

    // ---- generic node state ----

    fn state_key(node_id: &str, key: &str) -> String {
        format!("{node_id}:{key}")
    }

    pub fn node_state(&self, node_id: &str, key: &str) -> Option<&Value> {
        self.node_state.get(&Self::state_key(node_id, key))
    }

    pub fn set_node_state(&mut self, node_id: &str, key: &str, value: Value) {
        self.node_state.insert(Self::state_key(node_id, key), value);
        self.notify_persist();
    }

    pub fn clear_node_state(&mut self, node_id: &str, key: &str) {
        self.node_state.remove(&Self::state_key(node_id, key));
        self.notify_persist();
    }

    // ---- loading flags ----

    pub fn is_loading(&self, node_id: &str) -> bool {
        self.loading.contains(node_id)
    }

    pub fn set_loading(&mut self, node_id: &str, loading: bool) {
        if loading {
            self.loading.insert(node_id.to_string());
        } else {
            self.loading.remove(node_id);
        }
    }

    // ---- whole-pipeline operations ----

    pub fn clear(&mut self) {
        *self = Self {
            persist: self.persist.take(),
            ..Self::new()
        };
        self.notify_persist();
    }

    pub fn document(&self) -> PipelineDocument {
        PipelineDocument {
            system_prompt_config: self.system_prompt_config.clone(),
            nodes: self.nodes.clone(),
            outputs: self.outputs.clone(),
            user_inputs: self.user_inputs.clone(),
            node_state: self.node_state.clone(),
        }
    }

    /// Wholesale replacement from a parsed document. Loading flags reset;
    /// callers must parse (and thereby validate) before calling so a
    /// corrupt paste never partially applies.
    pub fn restore(&mut self, document: PipelineDocument) {
        self.system_prompt_config = document.system_prompt_config;
        self.nodes = document.nodes;
        self.outputs = document.outputs;
        self.user_inputs = document.user_inputs;
        self.node_state = document.node_state;
        self.loading.clear();
        self.notify_persist();
    }
}
