//! Thin contract over a chat-completion provider with tool calling.

mod openai;

pub use openai::OpenAiChatClient;

use async_trait::async_trait;

use crate::agent::message::ChatMessage;
use crate::error::Result;
use crate::tools::ToolDefinition;

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The assistant message returned by the provider.
///
/// `tool_call_id` correlation is preserved: every tool call carries the id
/// the provider assigned, and tool-role replies must echo it.
#[derive(Debug, Clone, Default)]
pub struct AssistantReply {
    pub content: String,
    pub tool_calls: Vec<crate::agent::message::ToolCall>,
    pub usage: Option<ChatUsage>,
}

/// Client capable of one operation: a blocking chat completion.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat_completion(&self, request: ChatRequest) -> Result<AssistantReply>;
}
