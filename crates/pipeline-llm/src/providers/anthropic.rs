//! Anthropic Messages API provider.
//!
//! Speaks the Messages API directly against the configured gateway. The
//! non-streaming `complete` path carries tools and image attachments; the
//! SSE `stream` path is text-only.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use pipeline_core::{ToolChoice, ToolInvocation};

use crate::provider::{InferenceClient, LLMError, LLMStream, Result};
use crate::providers::common::sse::chunk_stream_from_sse;
use crate::types::{Completion, CompletionRequest, LLMChunk};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        use reqwest::header::{HeaderValue, CONTENT_TYPE};

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| LLMError::Auth(format!("Invalid API key: {}", e)))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    async fn post_messages(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .headers(self.build_headers()?)
            .json(body)
            .send()
            .await
            .map_err(LLMError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.map_err(LLMError::Http)?;

            if status == 401 || status == 403 {
                return Err(LLMError::Auth(format!(
                    "Anthropic authentication failed: {}. Please check your API key.",
                    text
                )));
            }

            return Err(LLMError::Api(format!(
                "Anthropic API error: HTTP {}: {}",
                status, text
            )));
        }

        Ok(response)
    }

    fn request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        build_messages_request(request, self.max_tokens, stream)
    }
}

#[async_trait]
impl InferenceClient for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = self.request_body(request, false);
        let response = self.post_messages(&body).await?;
        let parsed: MessagesResponse = response.json().await.map_err(LLMError::Http)?;
        Ok(completion_from_response(parsed))
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<LLMStream> {
        let body = self.request_body(request, true);
        let response = self.post_messages(&body).await?;

        Ok(chunk_stream_from_sse(response, |event, data| {
            parse_stream_event(event, data)
        }))
    }
}

/// Build a Messages API request body. Pure conversion, no I/O.
///
/// Image blocks always precede the text block in the user message; the
/// model grounds visual input noticeably better that way, so the ordering
/// is a hard rule here rather than a caller choice.
pub fn build_messages_request(request: &CompletionRequest, default_max_tokens: u32, stream: bool) -> Value {
    let mut content: Vec<Value> = request
        .images
        .iter()
        .map(|image| {
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data,
                },
            })
        })
        .collect();
    content.push(json!({
        "type": "text",
        "text": request.user_message,
    }));

    let mut body = json!({
        "model": request.model,
        "max_tokens": request.max_tokens.unwrap_or(default_max_tokens),
        "temperature": request.temperature,
        "stream": stream,
        "messages": [
            {
                "role": "user",
                "content": content,
            }
        ],
    });

    if !request.system_prompt.is_empty() {
        body["system"] = json!(request.system_prompt);
    }

    if !request.tools.is_empty() {
        body["tools"] = json!(request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.input_schema,
                })
            })
            .collect::<Vec<Value>>());

        let tool_choice = request.tool_choice.clone().unwrap_or_default();
        body["tool_choice"] = match tool_choice {
            ToolChoice::Auto => json!({"type": "auto"}),
            ToolChoice::Any => json!({"type": "any"}),
            ToolChoice::Tool { name } => json!({"type": "tool", "name": name}),
        };
    }

    body
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

fn completion_from_response(response: MessagesResponse) -> Completion {
    let mut completion = Completion::default();
    for block in response.content {
        match block {
            ResponseContentBlock::Text { text } => completion.text.push_str(&text),
            ResponseContentBlock::ToolUse { id, name, input } => {
                completion.tool_uses.push(ToolInvocation {
                    tool_name: name,
                    tool_id: id,
                    input,
                });
            }
            ResponseContentBlock::Unknown => {}
        }
    }
    completion
}

/// Parse one Anthropic SSE event into an optional [`LLMChunk`].
fn parse_stream_event(event_type: &str, data: &str) -> Result<Option<LLMChunk>> {
    match event_type {
        "ping" | "message_start" | "message_delta" | "content_block_start"
        | "content_block_stop" => Ok(None),
        "message_stop" => Ok(Some(LLMChunk::Done)),
        "error" => Err(LLMError::Api(format!("Anthropic error event: {data}"))),
        "content_block_delta" => {
            let value: Value = serde_json::from_str(data)?;
            match value["delta"]["text"].as_str() {
                Some(text) => Ok(Some(LLMChunk::Token(text.to_string()))),
                None => Ok(None),
            }
        }
        other => {
            log::debug!("ignoring unknown SSE event type: {other}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use pipeline_core::ToolDescriptor;

    use super::*;
    use crate::types::ImageAttachment;

    fn request_with(tools: Vec<ToolDescriptor>, images: Vec<ImageAttachment>) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are terse.".to_string(),
            user_message: "Hi".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            tool_choice: None,
            images,
        }
    }

    #[test]
    fn image_blocks_precede_the_text_block() {
        let request = request_with(
            vec![],
            vec![ImageAttachment {
                media_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            }],
        );

        let body = build_messages_request(&request, 1024, false);
        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], "Hi");
    }

    #[test]
    fn tool_choice_defaults_to_auto_when_tools_present() {
        let request = request_with(
            vec![ToolDescriptor {
                name: "display_color".to_string(),
                description: "Display a color".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            vec![],
        );

        let body = build_messages_request(&request, 1024, false);
        assert_eq!(body["tool_choice"]["type"], "auto");
        assert_eq!(body["tools"][0]["name"], "display_color");

        let bare = build_messages_request(&request_with(vec![], vec![]), 1024, false);
        assert!(bare.get("tools").is_none());
        assert!(bare.get("tool_choice").is_none());
    }

    #[tokio::test]
    async fn complete_parses_text_and_tool_use_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"model": "claude-3-haiku-20240307"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Here you go."},
                    {
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "display_mood_color",
                        "input": {"hex": "#ff8800"}
                    }
                ],
                "model": "claude-3-haiku-20240307",
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", server.uri());
        let completion = provider
            .complete(&request_with(vec![], vec![]))
            .await
            .expect("completion");

        assert_eq!(completion.text, "Here you go.");
        assert_eq!(completion.tool_uses.len(), 1);
        assert_eq!(completion.tool_uses[0].tool_name, "display_mood_color");
        assert_eq!(completion.tool_uses[0].tool_id, "toolu_1");
        assert_eq!(completion.tool_uses[0].input["hex"], "#ff8800");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", server.uri());
        let err = provider
            .complete(&request_with(vec![], vec![]))
            .await
            .expect_err("error");
        assert!(matches!(err, LLMError::Api(_)));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", server.uri());
        let err = provider
            .complete(&request_with(vec![], vec![]))
            .await
            .expect_err("error");
        assert!(matches!(err, LLMError::Auth(_)));
    }

    #[tokio::test]
    async fn stream_yields_ordered_tokens_then_done() {
        let sse_body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\"}\n",
            "\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n",
            "\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n",
            "\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n",
            "\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body),
            )
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", server.uri());
        let mut stream = provider
            .stream(&request_with(vec![], vec![]))
            .await
            .expect("stream");

        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.expect("chunk"));
        }
        assert_eq!(
            chunks,
            vec![
                LLMChunk::Token("Hel".to_string()),
                LLMChunk::Token("lo".to_string()),
                LLMChunk::Done,
            ]
        );
    }
}
