//! Callable capabilities attached to agents.
//!
//! Capabilities are enumerated explicitly at agent construction; an agent
//! built without tools simply cannot call any.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::ResearcherError;
use crate::provider::ToolSpec;
use crate::search::SearchClient;

/// A capability the model may invoke during a conversation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    async fn call(&self, arguments: Value) -> Result<Value, ResearcherError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Web search capability backed by the windowed [`SearchClient`].
pub struct SearchTool {
    client: SearchClient,
}

impl SearchTool {
    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "internet_search"
    }

    fn description(&self) -> &str {
        "Search the internet for information using DuckDuckGo. Always pass your \
         assigned agent number so searches stay attributable."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string to find relevant information."
                },
                "agent_number": {
                    "type": "integer",
                    "description": "The agent number making the search, for tracking purposes."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of search results to return (default: 5)."
                }
            },
            "required": ["query", "agent_number"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ResearcherError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ResearcherError::Search("internet_search requires a query".into()))?;
        let agent_number = arguments
            .get("agent_number")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;
        let max_results = arguments
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        let results = self.client.search(query, agent_number, max_results).await?;
        Ok(json!({ "results": results }))
    }
}
