//! Genie node capability: tool text for the model and response parsing.

use std::sync::OnceLock;

use regex::Regex;

use pipeline_core::{InferenceResult, NodeConfig};

use crate::capability::{GenieUpdate, NodeCapability, NodeUpdate};
use crate::synth::{genie_message_tool_name, is_genie_message_tool};

pub struct GenieCapability;

fn backstory_pattern() -> &'static Regex {
    // Deprecated text protocol; tool calls are the supported mechanism.
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)UPDATE_GENIE_BACKSTORY:\s*(.+?)(?:\n|$)").expect("valid backstory pattern")
    })
}

impl NodeCapability for GenieCapability {
    /// Tells the model about the genie and insists on the message tool.
    /// The repeated imperative is a prompting workaround: without it the
    /// model tends to narrate "I'll tell the genie" instead of calling
    /// the tool. Routing stays tolerant of that either way.
    fn meta(&self, config: &NodeConfig, node_id: &str) -> String {
        let NodeConfig::Genie(config) = config else {
            return String::new();
        };

        let genie = config.display_name();
        let tool_name = genie_message_tool_name(config);
        let backstory = if config.backstory.trim().is_empty() {
            "No backstory set"
        } else {
            config.backstory.as_str()
        };

        format!(
            "Available output block:\n\
             - \"{genie}\": {node_id}, tool: {tool_name}\n\n\
             To send a message to {genie}, you MUST call the {tool_name} tool with:\n\
             - message: A valid message string to send to {genie}. This will be added to \
             {genie}'s conversation with role \"system\", and {genie} will automatically \
             respond to it.\n\n\
             CRITICAL: If you want to communicate with {genie}, you MUST use the {tool_name} \
             tool. Simply mentioning {genie} in your text response is NOT sufficient - you \
             must make a tool call.\n\n\
             {genie}'s backstory: {backstory}"
        )
    }

    /// Extracts an inbound message from a genie message tool call, falling
    /// back to the legacy `UPDATE_GENIE_BACKSTORY:` text pattern. The
    /// regex path exists for old pipelines only; do not extend it.
    fn parse(&self, result: &InferenceResult, _node_id: &str) -> Option<NodeUpdate> {
        for call in &result.tool_calls {
            if is_genie_message_tool(&call.tool_name) {
                if let Some(message) = call.input.get("message").and_then(|m| m.as_str()) {
                    if !message.is_empty() {
                        return Some(NodeUpdate::Genie(GenieUpdate {
                            message: Some(message.to_string()),
                            ..Default::default()
                        }));
                    }
                }
            }
        }

        let captures = backstory_pattern().captures(&result.response_text)?;
        let backstory = captures.get(1)?.as_str().trim();
        if backstory.is_empty() {
            return None;
        }
        Some(NodeUpdate::Genie(GenieUpdate {
            backstory: Some(backstory.to_string()),
            should_auto_respond: true,
            ..Default::default()
        }))
    }
}
