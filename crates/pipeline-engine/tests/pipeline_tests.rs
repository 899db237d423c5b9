//! End-to-end pipeline runs against a scripted provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::json;

use pipeline_core::{
    ChatRole, ColorDisplayConfig, GenieConfig, InferenceConfig, NodeConfig, PipelineNode,
    PipelineStore, SystemPromptConfig, TextInputConfig, ToolInvocation,
};
use pipeline_engine::{state, EngineError, InferenceRunner, SharedStore};
use pipeline_llm::{Completion, CompletionRequest, InferenceClient, LLMChunk, LLMError, LLMStream};

/// Replays a fixed list of completions (and one optional stream script),
/// recording every request it sees.
struct ScriptedClient {
    completions: StdMutex<VecDeque<pipeline_llm::Result<Completion>>>,
    stream_chunks: StdMutex<Option<Vec<pipeline_llm::Result<LLMChunk>>>>,
    requests: StdMutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    fn new(completions: Vec<pipeline_llm::Result<Completion>>) -> Arc<Self> {
        Arc::new(Self {
            completions: StdMutex::new(completions.into()),
            stream_chunks: StdMutex::new(None),
            requests: StdMutex::new(Vec::new()),
        })
    }

    fn with_stream(chunks: Vec<pipeline_llm::Result<LLMChunk>>) -> Arc<Self> {
        let client = Self::new(Vec::new());
        *client.stream_chunks.lock().unwrap() = Some(chunks);
        client
    }

    fn text(text: &str) -> pipeline_llm::Result<Completion> {
        Ok(Completion {
            text: text.to_string(),
            tool_uses: Vec::new(),
        })
    }

    fn with_tool_calls(text: &str, calls: Vec<ToolInvocation>) -> pipeline_llm::Result<Completion> {
        Ok(Completion {
            text: text.to_string(),
            tool_uses: calls,
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> pipeline_llm::Result<Completion> {
        self.requests.lock().unwrap().push(request.clone());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::Api("script exhausted".to_string())))
    }

    async fn stream(&self, request: &CompletionRequest) -> pipeline_llm::Result<LLMStream> {
        self.requests.lock().unwrap().push(request.clone());
        let chunks = self
            .stream_chunks
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| LLMError::Stream("no stream scripted".to_string()))?;
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Removes pipeline nodes while the completion is "in flight", then
/// replies with a scripted completion.
struct DeletingClient {
    store: SharedStore,
    remove: Vec<String>,
    completion: StdMutex<Option<Completion>>,
}

impl DeletingClient {
    fn new(store: SharedStore, remove: &[&str], completion: Completion) -> Arc<Self> {
        Arc::new(Self {
            store,
            remove: remove.iter().map(|id| id.to_string()).collect(),
            completion: StdMutex::new(Some(completion)),
        })
    }
}

#[async_trait]
impl InferenceClient for DeletingClient {
    async fn complete(&self, _request: &CompletionRequest) -> pipeline_llm::Result<Completion> {
        let mut store = self.store.lock().await;
        for id in &self.remove {
            store.remove_node(id);
        }
        self.completion
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| LLMError::Api("script exhausted".to_string()))
    }

    async fn stream(&self, _request: &CompletionRequest) -> pipeline_llm::Result<LLMStream> {
        Err(LLMError::Stream("not scripted".to_string()))
    }
}

fn inference_node(id: &str) -> PipelineNode {
    PipelineNode::with_id(
        id,
        NodeConfig::Inference(InferenceConfig {
            model: "claude-3-5-sonnet-20241022".to_string(),
            temperature: 0.7,
            max_tokens: None,
            system_prompt: None,
            context_mode: Default::default(),
        }),
    )
}

fn color_node(id: &str, name: &str) -> PipelineNode {
    PipelineNode::with_id(
        id,
        NodeConfig::ColorDisplay(ColorDisplayConfig {
            name: Some(name.to_string()),
            label: None,
            show_hex: None,
        }),
    )
}

fn genie_node(id: &str, name: &str) -> PipelineNode {
    PipelineNode::with_id(
        id,
        NodeConfig::Genie(GenieConfig {
            name: name.to_string(),
            backstory: "A sea captain.".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.7,
            auto_respond_on_update: None,
        }),
    )
}

fn call(name: &str, input: serde_json::Value) -> ToolInvocation {
    ToolInvocation {
        tool_name: name.to_string(),
        tool_id: "toolu_1".to_string(),
        input,
    }
}

fn shared(store: PipelineStore) -> SharedStore {
    Arc::new(tokio::sync::Mutex::new(store))
}

#[tokio::test]
async fn terse_formal_pipeline_assembles_prompt_without_tools() {
    let mut store = PipelineStore::new();
    store.set_system_prompt_config(SystemPromptConfig {
        prompt: "You are terse.".to_string(),
    });
    store.add_node(
        PipelineNode::with_id("t1", NodeConfig::TextInput(TextInputConfig::default())),
        None,
    );
    store.add_node(inference_node("i1"), None);
    store.set_user_input("t1", "Be formal.");
    store.set_user_input("i1", "Hi");

    let client = ScriptedClient::new(vec![ScriptedClient::text("Good day.")]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client.clone());

    let result = runner.run("i1").await.unwrap();
    assert!(!result.is_error());
    assert_eq!(result.response_text, "Good day.");

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].system_prompt;
    let terse_at = prompt.find("You are terse.").unwrap();
    let formal_at = prompt.find("Be formal.").unwrap();
    assert!(terse_at < formal_at);
    assert!(requests[0].tools.is_empty());

    let store = store.lock().await;
    assert_eq!(
        store.output("i1"),
        Some(&json!({ "content": "Good day." }))
    );
    assert!(!store.is_loading("i1"));
}

#[tokio::test]
async fn mood_color_tool_call_sets_the_display_output_verbatim() {
    let mut store = PipelineStore::new();
    store.add_node(color_node("c1", "mood"), None);
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "How do I seem?");

    let input = json!({ "hex": "#00ff00", "explanation": "calm" });
    let client = ScriptedClient::new(vec![ScriptedClient::with_tool_calls(
        "You seem calm.",
        vec![call("display_mood_color", input.clone())],
    )]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client.clone());

    let result = runner.run("i1").await.unwrap();
    assert_eq!(result.tool_calls.len(), 1);

    let requests = client.requests();
    assert!(requests[0].tools.iter().any(|t| t.name == "display_mood_color"));

    let store = store.lock().await;
    assert_eq!(store.output("c1"), Some(&input));
    assert_eq!(
        store.output("i1"),
        Some(&json!({ "content": "You seem calm." }))
    );
}

#[tokio::test]
async fn genie_message_round_trip_appends_three_turns() {
    let mut store = PipelineStore::new();
    store.add_node(genie_node("g1", "luke"), None);
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Tell luke the tide is rising.");

    let client = ScriptedClient::new(vec![
        ScriptedClient::with_tool_calls(
            "Passing that along.",
            vec![call("send_message_to_luke", json!({ "message": "The tide is rising." }))],
        ),
        ScriptedClient::text("Then we sail at dawn."),
    ]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client.clone());

    runner.run("i1").await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    // The genie's own call carries its identity, not the pipeline's tools.
    assert!(requests[1].system_prompt.contains("You are luke."));
    assert!(requests[1].tools.is_empty());

    let store = store.lock().await;
    let conversation = state::genie_conversation(&store, "g1").unwrap();
    assert_eq!(conversation.messages.len(), 3);
    assert_eq!(conversation.messages[0].role, ChatRole::System);
    assert_eq!(conversation.messages[0].content, "The tide is rising.");
    assert_eq!(conversation.messages[1].role, ChatRole::User);
    assert_eq!(conversation.messages[2].role, ChatRole::Assistant);
    assert_eq!(conversation.messages[2].content, "Then we sail at dawn.");
}

#[tokio::test]
async fn genie_update_tool_is_routed_but_never_offered() {
    let mut store = PipelineStore::new();
    store.add_node(genie_node("g1", "luke"), None);
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Make luke a pirate.");

    let client = ScriptedClient::new(vec![ScriptedClient::with_tool_calls(
        "Done.",
        vec![call("update_genie_luke", json!({ "backstory": "A pirate." }))],
    )]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client.clone());

    runner.run("i1").await.unwrap();

    let requests = client.requests();
    assert!(requests[0].tools.iter().all(|t| t.name != "update_genie_luke"));
    assert!(requests[0].tools.iter().any(|t| t.name == "send_message_to_luke"));

    let store = store.lock().await;
    let NodeConfig::Genie(config) = &store.node("g1").unwrap().config else {
        panic!("not a genie");
    };
    assert_eq!(config.backstory, "A pirate.");
    // Genie calls never become node outputs.
    assert!(store.output("g1").is_none());
}

#[tokio::test]
async fn output_for_a_node_deleted_mid_flight_is_discarded() {
    let mut store = PipelineStore::new();
    store.add_node(color_node("c1", "mood"), None);
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "How do I seem?");
    let store = shared(store);

    let client = DeletingClient::new(
        store.clone(),
        &["c1"],
        Completion {
            text: "You seem calm.".to_string(),
            tool_uses: vec![call("display_mood_color", json!({ "hex": "#ff0000" }))],
        },
    );
    let runner = InferenceRunner::new(store.clone(), client);

    let result = runner.run("i1").await.unwrap();
    assert!(!result.is_error());

    let store = store.lock().await;
    // The display node is gone; its call must not resurrect an output entry.
    assert!(store.output("c1").is_none());
    assert_eq!(
        store.output("i1"),
        Some(&json!({ "content": "You seem calm." }))
    );
}

#[tokio::test]
async fn inference_node_deleted_mid_flight_stores_nothing() {
    let mut store = PipelineStore::new();
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Hi");
    let store = shared(store);

    let client = DeletingClient::new(
        store.clone(),
        &["i1"],
        Completion {
            text: "Too late.".to_string(),
            tool_uses: Vec::new(),
        },
    );
    let runner = InferenceRunner::new(store.clone(), client);

    let result = runner.run("i1").await.unwrap();
    assert!(!result.is_error());

    let store = store.lock().await;
    assert!(store.output("i1").is_none());
    assert!(!store.is_loading("i1"));
}

#[tokio::test]
async fn provider_failure_comes_back_as_an_error_result_with_state_untouched() {
    let mut store = PipelineStore::new();
    store.add_node(color_node("c1", "mood"), None);
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Hi");

    let client = ScriptedClient::new(vec![Err(LLMError::Api("gateway down".to_string()))]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client);

    let result = runner.run("i1").await.unwrap();
    assert!(result.is_error());

    let store = store.lock().await;
    assert!(store.output("i1").is_none());
    assert!(store.output("c1").is_none());
    assert!(!store.is_loading("i1"));
}

#[tokio::test]
async fn blank_user_input_is_rejected_before_any_call() {
    let mut store = PipelineStore::new();
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "  ");

    let client = ScriptedClient::new(vec![ScriptedClient::text("never sent")]);
    let store = shared(store);
    let runner = InferenceRunner::new(store, client.clone());

    let err = runner.run("i1").await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyUserMessage));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn streaming_accumulates_tokens_in_order() {
    let mut store = PipelineStore::new();
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Hi");

    let client = ScriptedClient::with_stream(vec![
        Ok(LLMChunk::Token("Good ".to_string())),
        Ok(LLMChunk::Token("day.".to_string())),
        Ok(LLMChunk::Done),
    ]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client);

    let mut seen = Vec::new();
    let result = runner
        .run_streaming("i1", |token| seen.push(token.to_string()))
        .await
        .unwrap();

    assert_eq!(seen, vec!["Good ".to_string(), "day.".to_string()]);
    assert_eq!(result.response_text, "Good day.");

    let store = store.lock().await;
    assert_eq!(
        store.output("i1"),
        Some(&json!({ "content": "Good day." }))
    );
}

#[tokio::test]
async fn truncated_stream_stores_nothing() {
    let mut store = PipelineStore::new();
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Hi");

    let client = ScriptedClient::with_stream(vec![Ok(LLMChunk::Token("Good ".to_string()))]);
    let store = shared(store);
    let runner = InferenceRunner::new(store.clone(), client);

    let err = runner.run_streaming("i1", |_| {}).await.unwrap_err();
    assert!(matches!(err, EngineError::StreamTruncated));

    let store = store.lock().await;
    assert!(store.output("i1").is_none());
    assert!(!store.is_loading("i1"));
}

#[tokio::test]
async fn streaming_refuses_runs_that_carry_tools() {
    let mut store = PipelineStore::new();
    store.add_node(color_node("c1", "mood"), None);
    store.add_node(inference_node("i1"), None);
    store.set_user_input("i1", "Hi");

    let client = ScriptedClient::with_stream(vec![Ok(LLMChunk::Done)]);
    let store = shared(store);
    let runner = InferenceRunner::new(store, client.clone());

    let err = runner.run_streaming("i1", |_| {}).await.unwrap_err();
    assert!(matches!(err, EngineError::StreamingUnavailable));
    assert!(client.requests().is_empty());
}
