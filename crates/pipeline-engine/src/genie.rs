//! Self-inferencing genie sub-agent.
//!
//! A genie node is an agent living inside the pipeline: it keeps its own
//! conversation memory, can be messaged by the main inference pass via a
//! tool call, and answers with its own completion built on the context of
//! the nodes above it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use pipeline_core::{
    ChatRole, GenieConfig, GenieConversation, InferenceResult, NodeConfig, NodeType, PipelineNode,
};
use pipeline_llm::{CompletionRequest, InferenceClient};

use crate::capability::{global_registry, NodeUpdate};
use crate::context::{build_system_prompt, PromptOptions};
use crate::error::EngineError;
use crate::state::{
    genie_conversation, ContextState, SharedStore, GENIE_BACKSTORY_UPDATE_KEY,
    GENIE_CONVERSATION_KEY,
};

/// Sent to a genie after its backstory changes, when auto-respond is on.
pub const AUTO_RESPOND_MESSAGE: &str = "Your backstory has been updated. Say something new.";

/// Kick-off exchange after a backstory save.
pub const INTRODUCE_MESSAGE: &str = "Introduce yourself.";

const AUTO_RESPOND_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct GenieEngine {
    store: SharedStore,
    client: Arc<dyn InferenceClient>,
}

fn identity_prompt(config: &GenieConfig, conversation: &GenieConversation) -> String {
    let name = config.display_name();
    let mut prompt = format!(
        "You are {name}. Act as {name} would act. {}",
        config.backstory
    );
    if !conversation.is_empty() {
        prompt.push_str("\n\nYour previous conversation:\n");
        for message in &conversation.messages {
            match message.role {
                ChatRole::User => prompt.push_str("User: "),
                _ => {
                    prompt.push_str(name);
                    prompt.push_str(": ");
                }
            }
            prompt.push_str(&message.content);
            prompt.push('\n');
        }
    }
    prompt
}

impl GenieEngine {
    pub fn new(store: SharedStore, client: Arc<dyn InferenceClient>) -> Self {
        Self { store, client }
    }

    /// Run one turn of the genie's own conversation, independent of the
    /// main pipeline. The exchange (user message plus reply) is appended
    /// to the genie's memory; a provider failure leaves the memory as it
    /// was. A turn already in flight for this node makes the call a no-op.
    pub async fn self_inference(
        &self,
        node_id: &str,
        user_message: &str,
    ) -> Result<(), EngineError> {
        let (request, conversation) = {
            let mut store = self.store.lock().await;
            let (config, index) = genie_at(&store, node_id)?;

            if store.is_loading(node_id) {
                log::debug!("[{node_id}] genie inference already in flight, skipping");
                return Ok(());
            }

            let conversation = genie_conversation(&store, node_id).unwrap_or_default();
            let preceding = store.nodes()[..index].to_vec();
            let state = ContextState::snapshot(&store);
            let system_prompt = build_system_prompt(
                &store.system_prompt_config().prompt,
                &preceding,
                &state,
                &PromptOptions {
                    additional_prompt: Some(identity_prompt(&config, &conversation)),
                    include_genie_conversations: true,
                },
            );

            store.set_loading(node_id, true);

            let request = CompletionRequest {
                system_prompt,
                user_message: user_message.to_string(),
                model: config.model.clone(),
                temperature: config.temperature,
                ..Default::default()
            };
            (request, conversation)
        };

        let result = self.client.complete(&request).await;

        let mut store = self.store.lock().await;
        store.set_loading(node_id, false);
        let completion = match result {
            Ok(completion) => completion,
            Err(e) => {
                log::error!("[{node_id}] genie inference failed: {e}");
                return Err(EngineError::LLM(e));
            }
        };

        let mut conversation = conversation;
        conversation.push(ChatRole::User, user_message);
        conversation.push(ChatRole::Assistant, completion.text);
        store.set_node_state(
            node_id,
            GENIE_CONVERSATION_KEY,
            serde_json::to_value(&conversation)?,
        );
        Ok(())
    }

    /// Replace the genie's backstory and restart its memory with a fresh
    /// introduction exchange. The old conversation is discarded only once
    /// the introduction succeeds.
    pub async fn save_backstory(
        &self,
        node_id: &str,
        backstory: impl Into<String>,
    ) -> Result<(), EngineError> {
        let backstory = backstory.into();
        let request = {
            let mut store = self.store.lock().await;
            let (mut config, index) = genie_at(&store, node_id)?;

            if store.is_loading(node_id) {
                log::debug!("[{node_id}] genie busy, backstory save deferred to caller");
                return Ok(());
            }

            config.backstory = backstory;
            store.update_config(node_id, NodeConfig::Genie(config.clone()));

            let preceding = store.nodes()[..index].to_vec();
            let state = ContextState::snapshot(&store);
            let name = config.display_name();
            let identity = format!(
                "You are {name}. Act as {name} would act. {}. {INTRODUCE_MESSAGE}",
                config.backstory
            );
            let system_prompt = build_system_prompt(
                &store.system_prompt_config().prompt,
                &preceding,
                &state,
                &PromptOptions {
                    additional_prompt: Some(identity),
                    include_genie_conversations: true,
                },
            );

            store.set_loading(node_id, true);

            CompletionRequest {
                system_prompt,
                user_message: INTRODUCE_MESSAGE.to_string(),
                model: config.model.clone(),
                temperature: config.temperature,
                ..Default::default()
            }
        };

        let result = self.client.complete(&request).await;

        let mut store = self.store.lock().await;
        store.set_loading(node_id, false);
        let completion = match result {
            Ok(completion) => completion,
            Err(e) => {
                log::error!("[{node_id}] genie introduction failed: {e}");
                return Err(EngineError::LLM(e));
            }
        };

        let mut conversation = GenieConversation::default();
        conversation.push(ChatRole::User, INTRODUCE_MESSAGE);
        conversation.push(ChatRole::Assistant, completion.text);
        store.set_node_state(
            node_id,
            GENIE_CONVERSATION_KEY,
            serde_json::to_value(&conversation)?,
        );
        Ok(())
    }

    /// Deliver a pipeline-originated message to the genie: it lands in the
    /// memory with the system role, and the genie responds to it
    /// immediately.
    pub async fn deliver_message(&self, node_id: &str, message: &str) -> Result<(), EngineError> {
        {
            let mut store = self.store.lock().await;
            let _ = genie_at(&store, node_id)?;

            let mut conversation = genie_conversation(&store, node_id).unwrap_or_default();
            conversation.push(ChatRole::System, message);
            store.set_node_state(
                node_id,
                GENIE_CONVERSATION_KEY,
                serde_json::to_value(&conversation)?,
            );
            store.set_node_state(node_id, GENIE_BACKSTORY_UPDATE_KEY, Value::Bool(true));
        }

        self.self_inference(node_id, message).await
    }

    /// Replace the genie's backstory in place (without restarting its
    /// memory) and, when the node opts in, schedule a delayed
    /// auto-response so the genie reacts to its new persona.
    pub async fn apply_backstory_update(
        &self,
        node_id: &str,
        backstory: &str,
        auto_respond_requested: bool,
    ) -> Result<(), EngineError> {
        let auto_respond = {
            let mut store = self.store.lock().await;
            let (mut config, _) = genie_at(&store, node_id)?;

            let opted_in = config.auto_respond_on_update.unwrap_or(false);
            config.backstory = backstory.to_string();
            store.update_config(node_id, NodeConfig::Genie(config));
            store.set_node_state(node_id, GENIE_BACKSTORY_UPDATE_KEY, Value::Bool(true));
            auto_respond_requested && opted_in
        };

        if auto_respond {
            let engine = self.clone();
            let node_id = node_id.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(AUTO_RESPOND_DELAY).await;
                if let Err(e) = engine.self_inference(&node_id, AUTO_RESPOND_MESSAGE).await {
                    log::error!("[{node_id}] auto-respond failed: {e}");
                }
            });
        }
        Ok(())
    }

    /// Sweep a finished main-pipeline response for the deprecated
    /// `UPDATE_GENIE_BACKSTORY:` text pattern and apply it to every genie
    /// among the preceding nodes. Tool-call updates are routed separately;
    /// this path exists for old pipelines only.
    pub async fn process_backstory_updates(
        &self,
        preceding_nodes: &[PipelineNode],
        result: &InferenceResult,
    ) -> Result<(), EngineError> {
        let registry = global_registry();
        for node in preceding_nodes {
            if node.node_type() != NodeType::Genie {
                continue;
            }
            let Some(capability) = registry.get(NodeType::Genie) else {
                continue;
            };
            if let Some(NodeUpdate::Genie(update)) = capability.parse(result, &node.id) {
                if let Some(backstory) = update.backstory {
                    self.apply_backstory_update(&node.id, &backstory, update.should_auto_respond)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Look up a genie node and its list position, cloning the config out so
/// the store lock does not have to be held across the provider call.
fn genie_at(
    store: &pipeline_core::PipelineStore,
    node_id: &str,
) -> Result<(GenieConfig, usize), EngineError> {
    let node = store
        .node(node_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;
    let NodeConfig::Genie(config) = &node.config else {
        return Err(EngineError::NotAGenieNode(node_id.to_string()));
    };
    let index = store
        .node_index(node_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;
    Ok((config.clone(), index))
}
