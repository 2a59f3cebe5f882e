//! Hosted chat-completion provider contracts.
//!
//! Each provider maps the transcript model onto its own wire format; the
//! orchestration layers only ever see [`ChatProvider`].

pub mod gemini;
pub mod groq;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ResearcherError;
use crate::transcript::Message;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Declaration of a callable capability, advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the accepted arguments.
    pub parameters: serde_json::Value,
}

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
}

/// The model's reply to a [`ChatRequest`].
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// A hosted chat-completion backend.
///
/// Errors propagate uncaught to the caller and abort the run; providers do
/// not retry or time out on their own.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantTurn, ResearcherError>;

    /// Short provider name used in error and log messages.
    fn name(&self) -> &str;
}
