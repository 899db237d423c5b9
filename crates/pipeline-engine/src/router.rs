//! Route tool calls from an inference result back to the nodes that
//! synthesized them.

use std::collections::BTreeMap;

use pipeline_core::{PipelineStore, ToolInvocation};
use serde_json::Value;

use crate::synth::{is_genie_message_tool, is_genie_update_tool, SynthesizedTools};

/// A `send_message_to_{name}` call addressed to a genie node.
#[derive(Debug, Clone, PartialEq)]
pub struct GenieDelivery {
    pub node_id: String,
    pub message: String,
}

/// An `update_genie_{name}` call addressed to a genie node.
#[derive(Debug, Clone, PartialEq)]
pub struct BackstoryUpdate {
    pub node_id: String,
    pub backstory: String,
}

/// What a routing pass did, plus the genie work it could not apply
/// synchronously.
#[derive(Debug, Default)]
pub struct RoutingOutcome {
    /// Node ids whose output was replaced, in node-id order.
    pub updated_nodes: Vec<String>,
    pub genie_deliveries: Vec<GenieDelivery>,
    pub backstory_updates: Vec<BackstoryUpdate>,
}

fn string_field(input: &Value, key: &str) -> Option<String> {
    input.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Apply a batch of tool invocations to the store.
///
/// Display and webhook calls replace the target node's output wholesale;
/// when the same node is addressed more than once in a batch, the last
/// call wins. Genie message calls keep per-call fidelity instead: each
/// one becomes its own delivery, in call order, since every delivery
/// triggers a genie turn. Genie work is collected for the caller rather
/// than applied here. Calls whose tool name is not in the synthesis map,
/// or whose target node was deleted while the completion was in flight,
/// are dropped with a log line; a bad call never aborts the rest of the
/// batch.
pub fn route_tool_calls(
    invocations: &[ToolInvocation],
    tools: &SynthesizedTools,
    store: &mut PipelineStore,
) -> RoutingOutcome {
    let mut outputs: BTreeMap<String, Value> = BTreeMap::new();
    let mut deliveries: Vec<GenieDelivery> = Vec::new();
    let mut updates: BTreeMap<String, BackstoryUpdate> = BTreeMap::new();

    for invocation in invocations {
        let Some(node_id) = tools.node_id_by_tool_name.get(&invocation.tool_name) else {
            log::warn!(
                "[router] dropping call to unknown tool '{}'",
                invocation.tool_name
            );
            continue;
        };

        if is_genie_message_tool(&invocation.tool_name) {
            match string_field(&invocation.input, "message") {
                Some(message) => {
                    deliveries.push(GenieDelivery {
                        node_id: node_id.clone(),
                        message,
                    });
                }
                None => {
                    log::warn!(
                        "[router] '{}' called without a message field",
                        invocation.tool_name
                    );
                }
            }
        } else if is_genie_update_tool(&invocation.tool_name) {
            match string_field(&invocation.input, "backstory") {
                Some(backstory) => {
                    updates.insert(
                        node_id.clone(),
                        BackstoryUpdate {
                            node_id: node_id.clone(),
                            backstory,
                        },
                    );
                }
                None => {
                    log::warn!(
                        "[router] '{}' called without a backstory field",
                        invocation.tool_name
                    );
                }
            }
        } else {
            outputs.insert(node_id.clone(), invocation.input.clone());
        }
    }

    let mut outcome = RoutingOutcome::default();
    for (node_id, output) in outputs {
        if store.node(&node_id).is_none() {
            log::warn!("[router] discarding output for deleted node {node_id}");
            continue;
        }
        log::debug!("[router] setting output on node {node_id}");
        store.set_output(&node_id, output);
        outcome.updated_nodes.push(node_id);
    }
    outcome.genie_deliveries = deliveries;
    outcome.backstory_updates = updates.into_values().collect();
    outcome
}
