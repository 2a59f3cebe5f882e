//! Stateless conversational agent runner.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::ResearcherError;
use crate::provider::{ChatProvider, ChatRequest, ToolCall, ToolSpec};
use crate::tool::Tool;
use crate::transcript::{Message, Transcript};

/// One configured invocation of a hosted model with an optional tool set.
pub struct AgentRunner {
    provider: Arc<dyn ChatProvider>,
    model: String,
    system_prompt: String,
    tools: Vec<Arc<dyn Tool>>,
    temperature: f32,
    max_turns: usize,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            temperature: 0.1,
            max_turns: 12,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Invoke the agent once with `query` as the initial user message and
    /// return the full transcript.
    ///
    /// Tool calls requested by the model are executed against the enumerated
    /// tool set and fed back until the model answers in plain text or the
    /// turn budget runs out. Provider errors propagate to the caller.
    #[instrument(name = "agent.run", skip(self, query), fields(model = %self.model))]
    pub async fn run(&self, query: &str) -> Result<Transcript, ResearcherError> {
        let mut transcript = Transcript::new();
        transcript.push(Message::system(&self.system_prompt));
        transcript.push(Message::user(query));

        let specs: Vec<ToolSpec> = self.tools.iter().map(|tool| tool.spec()).collect();

        for turn in 0..self.max_turns {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: transcript.messages().to_vec(),
                tools: specs.clone(),
                temperature: self.temperature,
            };

            let reply = self.provider.complete(request).await?;
            let content = reply.content.unwrap_or_default();
            let calls = reply.tool_calls;

            debug!(turn, tool_calls = calls.len(), "assistant turn received");

            if calls.is_empty() {
                transcript.push(Message::assistant(content));
                return Ok(transcript);
            }

            transcript.push(Message::assistant_with_calls(content, calls.clone()));
            for call in calls {
                let output = self.invoke_tool(&call).await;
                transcript.push(Message::tool(call.id, call.name, output.to_string()));
            }
        }

        warn!(max_turns = self.max_turns, "agent exhausted its turn budget");
        Ok(transcript)
    }

    /// Run a tool call, reporting failures back to the model instead of
    /// aborting the conversation.
    async fn invoke_tool(&self, call: &ToolCall) -> serde_json::Value {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == call.name) else {
            warn!(tool = %call.name, "model requested an unknown tool");
            return json!({ "error": format!("unknown tool: {}", call.name) });
        };

        match tool.call(call.arguments.clone()).await {
            Ok(value) => value,
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool call failed");
                json!({ "error": err.to_string() })
            }
        }
    }
}
