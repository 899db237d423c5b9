//! Tool synthesis for output-capable nodes.
//!
//! One JSON-Schema tool per output-capable node preceding the target
//! inference node, with a collision-free naming scheme. Tool names are
//! only meaningful within a single call; the inverse name -> node-id map
//! is rebuilt every time because pipeline edits invalidate names but
//! never node ids.

use std::collections::HashMap;

use serde_json::json;

use pipeline_core::{GenieConfig, NodeConfig, NodeType, PipelineNode, ToolDescriptor, ICON_IDS};

pub const GENIE_MESSAGE_TOOL_PREFIX: &str = "send_message_to_";
pub const GENIE_UPDATE_TOOL_PREFIX: &str = "update_genie_";

#[derive(Debug, Clone, Default)]
pub struct SynthesizedTools {
    /// Genie message tools first, then the rest in node-list order.
    pub tools: Vec<ToolDescriptor>,
    pub node_id_by_tool_name: HashMap<String, String>,
}

impl SynthesizedTools {
    /// The set actually handed to the model: backstory-update tools are
    /// held back (they are applied when routed, not offered for calling).
    pub fn model_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| !t.name.starts_with(GENIE_UPDATE_TOOL_PREFIX))
            .cloned()
            .collect()
    }
}

pub fn is_genie_message_tool(name: &str) -> bool {
    name.starts_with(GENIE_MESSAGE_TOOL_PREFIX)
}

pub fn is_genie_update_tool(name: &str) -> bool {
    name.starts_with(GENIE_UPDATE_TOOL_PREFIX)
}

/// Lowercase and squash anything outside `[a-z0-9_]` so user-supplied
/// discriminators produce valid tool names.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            out.push('_');
        }
    }
    out
}

pub fn genie_message_tool_name(config: &GenieConfig) -> String {
    let name = sanitize(config.display_name());
    if name.is_empty() || name == "genie" {
        format!("{GENIE_MESSAGE_TOOL_PREFIX}genie")
    } else {
        format!("{GENIE_MESSAGE_TOOL_PREFIX}{name}")
    }
}

pub fn genie_update_tool_name(config: &GenieConfig) -> String {
    let name = sanitize(config.display_name());
    if name.is_empty() {
        format!("{GENIE_UPDATE_TOOL_PREFIX}genie")
    } else {
        format!("{GENIE_UPDATE_TOOL_PREFIX}{name}")
    }
}

/// Default tool name and name-with-discriminator for a display/trigger
/// node type, e.g. `display_color` / `display_mood_color`.
pub(crate) fn display_tool_name(node_type: NodeType, discriminator: Option<&str>) -> Option<String> {
    let (prefix, suffix) = match node_type {
        NodeType::TextDisplay => ("display", "text"),
        NodeType::ColorDisplay => ("display", "color"),
        NodeType::IconDisplay => ("display", "icon"),
        NodeType::EmojiDisplay => ("display", "emoji"),
        NodeType::GaugeDisplay => ("display", "gauge"),
        NodeType::PixelArtDisplay => ("display", "pixel_art"),
        NodeType::WebhookTrigger => ("trigger", "webhook"),
        NodeType::Survey => ("display", "survey"),
        _ => return None,
    };

    Some(match discriminator.map(sanitize).filter(|d| !d.is_empty()) {
        Some(disc) => format!("{prefix}_{disc}_{suffix}"),
        None => format!("{prefix}_{suffix}"),
    })
}

fn display_tool_descriptor(node: &PipelineNode, name: String) -> ToolDescriptor {
    let label = match &node.config {
        NodeConfig::TextDisplay(c) => c.label.clone(),
        NodeConfig::ColorDisplay(c) => c.label.clone(),
        NodeConfig::IconDisplay(c) => c.label.clone(),
        NodeConfig::EmojiDisplay(c) => c.label.clone(),
        NodeConfig::GaugeDisplay(c) => c.label.clone(),
        NodeConfig::PixelArtDisplay(c) => c.label.clone(),
        NodeConfig::WebhookTrigger(c) => c.label.clone(),
        NodeConfig::Survey(c) => c.label.clone(),
        _ => None,
    };
    let labelled = |what: &str| match &label {
        Some(label) => format!("{what} in the \"{label}\" output block."),
        None => format!("{what}."),
    };

    let (description, input_schema) = match node.node_type() {
        NodeType::TextDisplay => (
            labelled("Display text"),
            json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string", "description": "The text to display"}
                },
                "required": ["content"]
            }),
        ),
        NodeType::ColorDisplay => (
            labelled("Display a color swatch"),
            json!({
                "type": "object",
                "properties": {
                    "hex": {"type": "string", "description": "Hex color, e.g. #ff8800"},
                    "name": {"type": "string", "description": "Human-readable color name"},
                    "explanation": {"type": "string", "description": "Why this color was chosen"}
                },
                "required": ["hex"]
            }),
        ),
        NodeType::IconDisplay => (
            labelled("Display an icon"),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "enum": ICON_IDS, "description": "Icon id"},
                    "label": {"type": "string"},
                    "explanation": {"type": "string"}
                },
                "required": ["id"]
            }),
        ),
        NodeType::EmojiDisplay => (
            labelled("Display an emoji"),
            json!({
                "type": "object",
                "properties": {
                    "emoji": {"type": "string", "description": "A single emoji character"},
                    "explanation": {"type": "string"}
                },
                "required": ["emoji"]
            }),
        ),
        NodeType::GaugeDisplay => (
            labelled("Display a numeric gauge"),
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": "number"},
                    "min": {"type": "number"},
                    "max": {"type": "number"},
                    "unit": {"type": "string"},
                    "label": {"type": "string"},
                    "explanation": {"type": "string"}
                },
                "required": ["value"]
            }),
        ),
        NodeType::PixelArtDisplay => (
            labelled("Display a pixel-art grid"),
            json!({
                "type": "object",
                "properties": {
                    "colors": {
                        "type": "object",
                        "description": "Palette mapping single-character symbols to colors",
                        "additionalProperties": {"type": "string"}
                    },
                    "grid": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "One string per row, using palette symbols"
                    },
                    "width": {"type": "integer"},
                    "height": {"type": "integer"},
                    "explanation": {"type": "string"}
                },
                "required": ["colors", "grid"]
            }),
        ),
        NodeType::WebhookTrigger => (
            labelled("Trigger an outbound webhook request"),
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string"},
                    "method": {"type": "string", "enum": ["GET", "POST", "PUT", "DELETE"]},
                    "headers": {"type": "object", "additionalProperties": {"type": "string"}},
                    "body": {"description": "Request body for POST/PUT"},
                    "explanation": {"type": "string"}
                },
                "required": ["url", "method"]
            }),
        ),
        NodeType::Survey => (
            labelled("Present a survey question with options"),
            json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string"},
                    "options": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": {"type": "string"},
                                "label": {"type": "string"}
                            },
                            "required": ["id", "label"]
                        }
                    },
                    "allow_multiple": {"type": "boolean"},
                    "explanation": {"type": "string"}
                },
                "required": ["question", "options"]
            }),
        ),
        other => unreachable!("not a display type: {other:?}"),
    };

    ToolDescriptor {
        name,
        description,
        input_schema,
    }
}

fn genie_message_descriptor(config: &GenieConfig, name: String) -> ToolDescriptor {
    let genie = config.display_name();
    ToolDescriptor {
        name,
        description: format!(
            "Send a message to {genie}. The message is added to {genie}'s conversation \
             with role \"system\" and {genie} will automatically respond to it."
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": format!("The message to deliver to {genie}")
                }
            },
            "required": ["message"]
        }),
    }
}

fn genie_update_descriptor(config: &GenieConfig, name: String) -> ToolDescriptor {
    let genie = config.display_name();
    ToolDescriptor {
        name,
        description: format!("Replace {genie}'s backstory with new persona text."),
        input_schema: json!({
            "type": "object",
            "properties": {
                "backstory": {
                    "type": "string",
                    "description": format!("The new backstory for {genie}")
                }
            },
            "required": ["backstory"]
        }),
    }
}

/// Synthesize tools for every output-capable node in `all_nodes[..target_index]`.
///
/// Would-be name collisions (two same-typed nodes with the same or no
/// discriminator) are disambiguated by suffixing the node's list position,
/// so nothing is ever silently dropped.
pub fn tools_for_downstream_nodes(
    all_nodes: &[PipelineNode],
    target_index: usize,
) -> SynthesizedTools {
    let target_index = target_index.min(all_nodes.len());

    let mut genie_tools: Vec<ToolDescriptor> = Vec::new();
    let mut other_tools: Vec<ToolDescriptor> = Vec::new();
    let mut node_id_by_tool_name: HashMap<String, String> = HashMap::new();

    let mut claim = |name: String, node_id: &str, position: usize| -> String {
        let unique = if node_id_by_tool_name.contains_key(&name) {
            format!("{name}_{position}")
        } else {
            name
        };
        node_id_by_tool_name.insert(unique.clone(), node_id.to_string());
        unique
    };

    for (position, node) in all_nodes[..target_index].iter().enumerate() {
        if !node.node_type().is_output_capable() {
            continue;
        }

        if let NodeConfig::Genie(config) = &node.config {
            let message_name = claim(genie_message_tool_name(config), &node.id, position);
            genie_tools.push(genie_message_descriptor(config, message_name));

            let update_name = claim(genie_update_tool_name(config), &node.id, position);
            genie_tools.push(genie_update_descriptor(config, update_name));
            continue;
        }

        if let Some(name) = display_tool_name(node.node_type(), node.config.discriminator()) {
            let unique = claim(name, &node.id, position);
            other_tools.push(display_tool_descriptor(node, unique));
        }
    }

    // Message-delivery tools lead the list; they need the strongest
    // prompting to be invoked at all.
    let mut tools = genie_tools;
    tools.extend(other_tools);

    SynthesizedTools {
        tools,
        node_id_by_tool_name,
    }
}
