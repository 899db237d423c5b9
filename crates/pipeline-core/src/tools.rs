//! Tool descriptors and model tool-call records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model-invocable structured-output descriptor. Names are unique within
/// one inference call only; node ids are the stable identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    Any,
    Tool {
        name: String,
    },
}

/// One structured invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub tool_id: String,
    pub input: Value,
}

/// Outcome of one inference exchange. Provider failures land in `error`;
/// when `error` is set no node state may have been touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceResult {
    pub response_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InferenceResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            response_text: String::new(),
            tool_calls: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
