//! Google Gemini chat provider (`generateContent` REST surface).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ResearcherError;
use crate::security::SecretValue;
use crate::transcript::{Message, Role};

use super::{AssistantTurn, ChatProvider, ChatRequest, ToolCall, ToolSpec};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER_NAME: &str = "gemini";

/// Client for the Gemini `models/{model}:generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretValue,
}

impl GeminiClient {
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
impl ChatProvider for GeminiClient {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantTurn, ResearcherError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = GenerateContentRequest::from_chat(&request);

        debug!(model = %request.model, contents = body.contents.len(), "calling gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
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

        let parsed: GenerateContentResponse = response
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
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_chat(request: &ChatRequest) -> Self {
        let mut system_instruction = None;
        let mut contents: Vec<Content> = Vec::new();

        for message in &request.messages {
            match message.role {
                Role::System => {
                    system_instruction = Some(SystemInstruction {
                        parts: vec![Part::text(&message.content)],
                    });
                }
                Role::User => contents.push(Content {
                    role: "user",
                    parts: vec![Part::text(&message.content)],
                }),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !message.content.is_empty() {
                        parts.push(Part::text(&message.content));
                    }
                    for call in &message.tool_calls {
                        parts.push(Part::function_call(call));
                    }
                    if parts.is_empty() {
                        parts.push(Part::text(""));
                    }
                    contents.push(Content {
                        role: "model",
                        parts,
                    });
                }
                Role::Tool => contents.push(Content {
                    role: "user",
                    parts: vec![Part::function_response(message)],
                }),
            }
        }

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(FunctionDeclaration::from_spec)
                    .collect(),
            }]
        };

        Self {
            system_instruction,
            contents,
            tools,
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            function_call: None,
            function_response: None,
        }
    }

    fn function_call(call: &ToolCall) -> Self {
        Self {
            text: None,
            function_call: Some(FunctionCall {
                name: call.name.clone(),
                args: call.arguments.clone(),
            }),
            function_response: None,
        }
    }

    fn function_response(message: &Message) -> Self {
        let name = message.tool_name.clone().unwrap_or_default();
        // The API requires an object payload; non-object tool output is wrapped.
        let value: serde_json::Value = serde_json::from_str(&message.content)
            .unwrap_or_else(|_| serde_json::Value::String(message.content.clone()));
        let response = if value.is_object() {
            value
        } else {
            serde_json::json!({ "result": value })
        };

        Self {
            text: None,
            function_call: None,
            function_response: Some(FunctionResponse { name, response }),
        }
    }
}

#[derive(Debug, Serialize)]
struct FunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl FunctionDeclaration {
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.parameters.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn into_turn(mut self) -> Result<AssistantTurn, ResearcherError> {
        if self.candidates.is_empty() {
            return Err(ResearcherError::provider(
                PROVIDER_NAME,
                "response contained no candidates",
            ));
        }
        let candidate = self.candidates.remove(0);

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    id: format!("call-{}", tool_calls.len() + 1),
                    name: call.name,
                    arguments: call.args,
                });
            }
        }

        Ok(AssistantTurn {
            content: (!content.is_empty()).then_some(content),
            tool_calls,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<ResponseFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}
