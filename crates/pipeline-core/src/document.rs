//! Serializable pipeline document — the copy/paste and storage boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;
use crate::node::config::SystemPromptConfig;
use crate::node::PipelineNode;

/// Everything persistable about a pipeline. Transient loading flags are
/// deliberately absent. Deserializing then re-serializing a document must
/// be structurally equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub system_prompt_config: SystemPromptConfig,
    #[serde(default)]
    pub nodes: Vec<PipelineNode>,
    #[serde(default)]
    pub outputs: HashMap<String, Value>,
    #[serde(default)]
    pub user_inputs: HashMap<String, String>,
    #[serde(default)]
    pub node_state: HashMap<String, Value>,
}

impl PipelineDocument {
    /// All-or-nothing parse: malformed input yields an error and no
    /// document.
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
