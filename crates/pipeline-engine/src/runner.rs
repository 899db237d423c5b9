//! Main inference pass: prompt assembly, the provider call, and fan-out
//! of the response back into the pipeline.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;

use pipeline_core::{
    InferenceConfig, InferenceResult, NodeConfig, NodeType, PipelineNode, FIXED_SYSTEM_PROMPT_ID,
};
use pipeline_llm::{
    AnthropicProvider, CompletionRequest, GatewayConfig, ImageAttachment, InferenceClient, LLMChunk,
};

use crate::context::{build_system_prompt, PromptOptions};
use crate::error::EngineError;
use crate::genie::GenieEngine;
use crate::router::route_tool_calls;
use crate::state::{ContextState, SharedStore, PAINT_IMAGE_KEY};
use crate::synth::{tools_for_downstream_nodes, SynthesizedTools};

/// Used when no preceding node contributes anything.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug)]
struct PreparedRun {
    request: CompletionRequest,
    synth: SynthesizedTools,
    preceding: Vec<PipelineNode>,
}

pub struct InferenceRunner {
    store: SharedStore,
    client: Arc<dyn InferenceClient>,
    genie: GenieEngine,
}

impl InferenceRunner {
    pub fn new(store: SharedStore, client: Arc<dyn InferenceClient>) -> Self {
        let genie = GenieEngine::new(store.clone(), client.clone());
        Self {
            store,
            client,
            genie,
        }
    }

    /// Build a runner backed by the configured LLM gateway. Fails before
    /// any network activity when the credential triple is incomplete.
    pub fn from_config(store: SharedStore, config: &GatewayConfig) -> Result<Self, EngineError> {
        let url = config.gateway_url().ok_or(EngineError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(EngineError::NotConfigured)?;
        let client: Arc<dyn InferenceClient> = Arc::new(AnthropicProvider::new(api_key, url));
        Ok(Self::new(store, client))
    }

    pub fn genie(&self) -> &GenieEngine {
        &self.genie
    }

    /// Run the pipeline rooted at an inference node.
    ///
    /// Validation problems (missing node, wrong type, blank user input)
    /// come back as `Err`. A provider failure instead yields an
    /// `InferenceResult` with `error` set and no state touched, so callers
    /// can surface it on the node. On success the response text becomes
    /// the node's own output, genie-addressed calls go to the genie
    /// engine, and the remaining tool calls are routed to their nodes.
    pub async fn run(&self, node_id: &str) -> Result<InferenceResult, EngineError> {
        let prepared = {
            let mut store = self.store.lock().await;
            if store.is_loading(node_id) {
                log::debug!("[{node_id}] inference already in flight, skipping");
                return Ok(InferenceResult::failure("Inference already running"));
            }
            let prepared = prepare(&store, node_id)?;
            store.set_loading(node_id, true);
            prepared
        };

        log::debug!(
            "[{node_id}] running inference: {} tools, {} images, prompt {} bytes",
            prepared.request.tools.len(),
            prepared.request.images.len(),
            prepared.request.system_prompt.len()
        );

        let (result, outcome) = {
            let result = self.client.complete(&prepared.request).await;

            let mut store = self.store.lock().await;
            store.set_loading(node_id, false);
            let completion = match result {
                Ok(completion) => completion,
                Err(e) => {
                    log::error!("[{node_id}] inference failed: {e}");
                    return Ok(InferenceResult::failure(e.to_string()));
                }
            };

            let result = InferenceResult {
                response_text: completion.text,
                tool_calls: completion.tool_uses,
                error: None,
            };

            // The node may have been deleted while the completion was in
            // flight; a response addressed to a dead id is discarded.
            if store.node(node_id).is_none() {
                log::warn!("[{node_id}] node deleted during inference, discarding response");
                return Ok(result);
            }
            if !result.response_text.is_empty() {
                store.set_output(node_id, json!({ "content": result.response_text }));
            }
            let outcome = route_tool_calls(&result.tool_calls, &prepared.synth, &mut store);
            (result, outcome)
        };

        // Genie work runs after the store lock is released; each step
        // failing is logged on the node rather than failing the run.
        for update in &outcome.backstory_updates {
            if let Err(e) = self
                .genie
                .apply_backstory_update(&update.node_id, &update.backstory, true)
                .await
            {
                log::error!("[{}] backstory update failed: {e}", update.node_id);
            }
        }
        for delivery in &outcome.genie_deliveries {
            if let Err(e) = self
                .genie
                .deliver_message(&delivery.node_id, &delivery.message)
                .await
            {
                log::error!("[{}] genie delivery failed: {e}", delivery.node_id);
            }
        }
        if let Err(e) = self
            .genie
            .process_backstory_updates(&prepared.preceding, &result)
            .await
        {
            log::error!("[{node_id}] legacy backstory sweep failed: {e}");
        }

        Ok(result)
    }

    /// Text-only streaming variant. Refused up front when the run would
    /// carry tools or images; a stream that ends without the done signal
    /// is an error and stores nothing.
    pub async fn run_streaming<F>(
        &self,
        node_id: &str,
        mut on_token: F,
    ) -> Result<InferenceResult, EngineError>
    where
        F: FnMut(&str),
    {
        let prepared = {
            let mut store = self.store.lock().await;
            if store.is_loading(node_id) {
                log::debug!("[{node_id}] inference already in flight, skipping");
                return Ok(InferenceResult::failure("Inference already running"));
            }
            let prepared = prepare(&store, node_id)?;
            if !prepared.request.tools.is_empty() || !prepared.request.images.is_empty() {
                return Err(EngineError::StreamingUnavailable);
            }
            store.set_loading(node_id, true);
            prepared
        };

        let streamed = self.consume_stream(&prepared.request, &mut on_token).await;

        let mut store = self.store.lock().await;
        store.set_loading(node_id, false);
        let text = streamed?;
        if !text.is_empty() && store.node(node_id).is_some() {
            store.set_output(node_id, json!({ "content": text }));
        }

        Ok(InferenceResult {
            response_text: text,
            tool_calls: Vec::new(),
            error: None,
        })
    }

    async fn consume_stream<F>(
        &self,
        request: &CompletionRequest,
        on_token: &mut F,
    ) -> Result<String, EngineError>
    where
        F: FnMut(&str),
    {
        let mut stream = self.client.stream(request).await?;
        let mut text = String::new();
        let mut done = false;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                LLMChunk::Token(token) => {
                    on_token(&token);
                    text.push_str(&token);
                }
                LLMChunk::Done => {
                    done = true;
                    break;
                }
            }
        }

        if !done {
            return Err(EngineError::StreamTruncated);
        }
        Ok(text)
    }
}

/// Validate the target node and assemble everything the provider call
/// needs, without mutating the store.
fn prepare(store: &pipeline_core::PipelineStore, node_id: &str) -> Result<PreparedRun, EngineError> {
    // The root system prompt participates as a node so that tool synthesis
    // and context assembly see one consistent ordered list.
    let mut full_nodes = Vec::with_capacity(store.nodes().len() + 1);
    full_nodes.push(PipelineNode::with_id(
        FIXED_SYSTEM_PROMPT_ID,
        NodeConfig::SystemPrompt(store.system_prompt_config().clone()),
    ));
    full_nodes.extend(store.nodes().iter().cloned());

    let index = full_nodes
        .iter()
        .position(|n| n.id == node_id)
        .ok_or_else(|| EngineError::NodeNotFound(node_id.to_string()))?;

    let config: InferenceConfig = match &full_nodes[index].config {
        NodeConfig::Inference(config) => config.clone(),
        _ => return Err(EngineError::NotAnInferenceNode(node_id.to_string())),
    };

    let user_message = store.user_input(node_id).unwrap_or_default().trim().to_string();
    if user_message.is_empty() {
        return Err(EngineError::EmptyUserMessage);
    }

    let synth = tools_for_downstream_nodes(&full_nodes, index);
    let preceding = full_nodes[..index].to_vec();

    let mut images: Vec<ImageAttachment> = Vec::new();
    for node in &preceding {
        if node.node_type() != NodeType::Paint {
            continue;
        }
        if let Some(value) = store.node_state(&node.id, PAINT_IMAGE_KEY) {
            match serde_json::from_value::<ImageAttachment>(value.clone()) {
                Ok(image) => images.push(image),
                Err(e) => log::warn!("[{}] ignoring malformed paint image: {e}", node.id),
            }
        }
    }

    let state = ContextState::snapshot(store);
    let options = PromptOptions {
        additional_prompt: config.system_prompt.clone(),
        include_genie_conversations: true,
    };
    let mut system_prompt = build_system_prompt(
        &store.system_prompt_config().prompt,
        &preceding,
        &state,
        &options,
    );
    if system_prompt.is_empty() {
        system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
    }

    let request = CompletionRequest {
        system_prompt,
        user_message,
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        tools: synth.model_tools(),
        images,
        ..Default::default()
    };

    Ok(PreparedRun {
        request,
        synth,
        preceding,
    })
}
