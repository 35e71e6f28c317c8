//! OpenAI-compatible Chat Completions adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::agent::message::{ChatMessage, ToolCall};
use crate::error::{Result, RunnerError};
use crate::tools::web::shared_client;

use super::{AssistantReply, ChatClient, ChatRequest, ChatUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Production [`ChatClient`] targeting any OpenAI-compatible endpoint.
pub struct OpenAiChatClient {
    api_key: String,
    base_url: String,
}

impl OpenAiChatClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            request.messages.iter().map(message_to_wire).collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        let object = body
            .as_object_mut()
            .expect("request body literal is an object");

        if let Some(temperature) = request.temperature {
            object.insert("temperature".into(), temperature.into());
        }

        if !request.tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|tool| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            object.insert("tools".into(), tool_defs.into());
        }

        body
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn chat_completion(&self, request: ChatRequest) -> Result<AssistantReply> {
        let body = self.build_request_body(&request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, tools = request.tools.len(), "chat completion request");

        let response = shared_client()
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RunnerError::api(status, body_text));
        }

        let data: WireChatResponse = response.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RunnerError::api(200, "no choices in chat completion response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(AssistantReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: data.usage.map(|usage| ChatUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}

/// Map a tagged message onto the OpenAI wire shape.
fn message_to_wire(message: &ChatMessage) -> serde_json::Value {
    match message {
        ChatMessage::System { content } => {
            serde_json::json!({ "role": "system", "content": content })
        }
        ChatMessage::User { content } => {
            serde_json::json!({ "role": "user", "content": content })
        }
        ChatMessage::Assistant {
            content,
            tool_calls,
        } => {
            if tool_calls.is_empty() {
                return serde_json::json!({ "role": "assistant", "content": content });
            }
            let calls: Vec<serde_json::Value> = tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": { "name": tc.name, "arguments": tc.arguments }
                    })
                })
                .collect();
            serde_json::json!({
                "role": "assistant",
                "content": if content.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(content.clone())
                },
                "tool_calls": calls,
            })
        }
        ChatMessage::Tool {
            tool_call_id,
            content,
        } => serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content,
        }),
    }
}

// Wire response types (internal).

#[derive(Deserialize)]
struct WireChatResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
