//! Groq chat provider (OpenAI-compatible `chat/completions` surface).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ResearcherError;
use crate::security::SecretValue;
use crate::transcript::{Message, Role};

use super::{AssistantTurn, ChatProvider, ChatRequest, ToolCall, ToolSpec};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const PROVIDER_NAME: &str = "groq";

/// Client for Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretValue,
}

impl GroqClient {
    pub fn new(api_key: SecretValue) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at an alternative endpoint (used by tests).
    pub fn with_base_url(api_key: SecretValue, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ChatProvider for GroqClient {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantTurn, ResearcherError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest::from_chat(&request);

        debug!(model = %request.model, messages = body.messages.len(), "calling groq");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| ResearcherError::provider(PROVIDER_NAME, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ResearcherError::provider(
                PROVIDER_NAME,
                format!("HTTP {status}: {detail}"),
            ));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ResearcherError::provider(PROVIDER_NAME, err.to_string()))?;

        parsed.into_turn()
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    temperature: f32,
}

impl CompletionRequest {
    fn from_chat(request: &ChatRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            tools: request.tools.iter().map(WireTool::from_spec).collect(),
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        match message.role {
            Role::System => Self::plain("system", &message.content),
            Role::User => Self::plain("user", &message.content),
            Role::Assistant => Self {
                role: "assistant",
                content: (!message.content.is_empty()).then(|| message.content.clone()),
                tool_calls: (!message.tool_calls.is_empty()).then(|| {
                    message
                        .tool_calls
                        .iter()
                        .map(WireToolCall::from_call)
                        .collect()
                }),
                tool_call_id: None,
            },
            Role::Tool => Self {
                role: "tool",
                content: Some(message.content.clone()),
                tool_calls: None,
                tool_call_id: message.tool_call_id.clone(),
            },
        }
    }

    fn plain(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

impl WireToolCall {
    fn from_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: "function".into(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object, as the wire format requires.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolSpec,
}

impl WireTool {
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireToolSpec {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireToolSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl CompletionResponse {
    fn into_turn(mut self) -> Result<AssistantTurn, ResearcherError> {
        if self.choices.is_empty() {
            return Err(ResearcherError::provider(
                PROVIDER_NAME,
                "response contained no choices",
            ));
        }
        let message = self.choices.remove(0).message;

        let mut tool_calls = Vec::new();
        for call in message.tool_calls.unwrap_or_default() {
            let arguments = serde_json::from_str(&call.function.arguments).map_err(|err| {
                ResearcherError::provider(
                    PROVIDER_NAME,
                    format!("malformed tool arguments: {err}"),
                )
            })?;
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            });
        }

        Ok(AssistantTurn {
            content: message.content.filter(|content| !content.is_empty()),
            tool_calls,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}
