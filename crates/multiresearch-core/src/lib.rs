//! MultiResearch core: concurrent multi-agent research orchestration.
//!
//! This crate dispatches a fixed set of search-capable research agents
//! against a query, merges their findings into a corpus, and hands the
//! corpus to a synthesis agent that writes the final markdown report.

mod agent;
mod config;
mod dispatch;
mod error;
mod export;
mod logging;
mod prompts;
mod provider;
mod search;
mod security;
mod tool;
mod transcript;
mod workflow;

pub use agent::AgentRunner;
pub use config::{Credentials, ResearchConfig};
pub use dispatch::{ResearchTask, dispatch_research};
pub use error::ResearcherError;
pub use export::ReportExporter;
pub use logging::{RunLogInput, log_run, remove_stale_logs};
pub use prompts::{research_system_prompt, synthesis_instructions, synthesis_request};
pub use provider::{
    AssistantTurn, ChatProvider, ChatRequest, ToolCall, ToolSpec, gemini::GeminiClient,
    groq::GroqClient,
};
pub use search::{DuckDuckGoBackend, SearchBackend, SearchClient, SearchResult, SearchWindow};
pub use security::SecretValue;
pub use tool::{SearchTool, Tool};
pub use transcript::{Message, Role, Transcript};
pub use workflow::{
    CredentialEngine, Finding, ResearchEngine, ResearchSession, RunOptions, RunOutcome, RunPhase,
    assemble_corpus,
};
