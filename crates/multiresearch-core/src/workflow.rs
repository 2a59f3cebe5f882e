//! End-to-end run workflow: fan-out, aggregation, synthesis.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::ResearcherError;
use crate::agent::AgentRunner;
use crate::config::{Credentials, ResearchConfig};
use crate::dispatch::{ResearchTask, dispatch_research};
use crate::prompts::{research_system_prompt, synthesis_instructions, synthesis_request};
use crate::provider::ChatProvider;
use crate::provider::gemini::GeminiClient;
use crate::provider::groq::GroqClient;
use crate::search::{DuckDuckGoBackend, SearchBackend, SearchClient};
use crate::tool::SearchTool;

/// Lifecycle of one research run.
///
/// `Done` and `Failed` are terminal; a failure at any stage discards all
/// partial work for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Dispatching,
    Aggregating,
    Synthesizing,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Aggregating => "aggregating",
            RunPhase::Synthesizing => "synthesizing",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }
}

/// Options for one research run.
pub struct RunOptions {
    pub query: String,
    /// Optional phase gauge observed by the hosting service.
    pub progress: Option<watch::Sender<RunPhase>>,
}

impl RunOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: watch::Sender<RunPhase>) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// One agent's extracted contribution, in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub agent_index: u32,
    pub text: String,
}

/// Join findings into the research corpus, separated by blank lines.
///
/// Ordering follows completion order of the producing agents and is not a
/// guaranteed property.
pub fn assemble_corpus(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|finding| finding.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The synthesized markdown report.
    pub report: String,
    /// Per-agent findings that fed the corpus.
    pub findings: Vec<Finding>,
}

/// Anything that can execute a research run; lets the HTTP layer swap the
/// live session for a stub in tests.
#[async_trait]
pub trait ResearchEngine: Send + Sync {
    async fn run(&self, options: RunOptions) -> Result<RunOutcome, ResearcherError>;
}

struct ResearchAgentSlot {
    index: u32,
    provider: Arc<dyn ChatProvider>,
}

/// A fully wired research session: provider per research agent, one
/// synthesis provider, one search backend.
pub struct ResearchSession {
    config: ResearchConfig,
    agents: Vec<ResearchAgentSlot>,
    synthesis: Arc<dyn ChatProvider>,
    search: Arc<dyn SearchBackend>,
}

impl std::fmt::Debug for ResearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchSession")
            .field("config", &self.config)
            .field("agents", &self.agents.len())
            .finish_non_exhaustive()
    }
}

impl ResearchSession {
    /// Wire a session from explicit providers. Agent indices are assigned
    /// contiguously from 1 in provider order.
    pub fn new(
        config: ResearchConfig,
        research_providers: Vec<Arc<dyn ChatProvider>>,
        synthesis: Arc<dyn ChatProvider>,
        search: Arc<dyn SearchBackend>,
    ) -> Result<Self, ResearcherError> {
        config.validate()?;
        if research_providers.len() != config.research_agents {
            return Err(ResearcherError::InvalidConfiguration(format!(
                "expected {} research providers, got {}",
                config.research_agents,
                research_providers.len()
            )));
        }

        let agents = research_providers
            .into_iter()
            .enumerate()
            .map(|(position, provider)| ResearchAgentSlot {
                index: position as u32 + 1,
                provider,
            })
            .collect();

        Ok(Self {
            config,
            agents,
            synthesis,
            search,
        })
    }

    /// Wire the production session: two Gemini research agents (one
    /// credential each), a Groq synthesis agent, DuckDuckGo search.
    pub fn from_credentials(
        config: ResearchConfig,
        credentials: &Credentials,
    ) -> Result<Self, ResearcherError> {
        let research_providers: Vec<Arc<dyn ChatProvider>> = vec![
            Arc::new(GeminiClient::new(credentials.gemini_primary()?)),
            Arc::new(GeminiClient::new(credentials.gemini_secondary()?)),
        ];
        let synthesis: Arc<dyn ChatProvider> = Arc::new(GroqClient::new(credentials.groq()?));

        Self::new(
            config,
            research_providers,
            synthesis,
            Arc::new(DuckDuckGoBackend::new()),
        )
    }

    /// Execute one run through the full pipeline.
    #[instrument(name = "research.run", skip_all)]
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome, ResearcherError> {
        let RunOptions { query, progress } = options;

        let result = self.run_inner(&query, progress.as_ref()).await;

        if let Some(gauge) = &progress {
            let terminal = if result.is_ok() {
                RunPhase::Done
            } else {
                RunPhase::Failed
            };
            let _ = gauge.send(terminal);
        }

        result
    }

    async fn run_inner(
        &self,
        query: &str,
        progress: Option<&watch::Sender<RunPhase>>,
    ) -> Result<RunOutcome, ResearcherError> {
        let send_phase = |phase: RunPhase| {
            if let Some(gauge) = progress {
                let _ = gauge.send(phase);
            }
        };

        let query = query.trim();
        if query.is_empty() {
            return Err(ResearcherError::EmptyQuery);
        }

        send_phase(RunPhase::Dispatching);

        let tasks: Vec<ResearchTask> = self
            .agents
            .iter()
            .map(|agent| ResearchTask {
                model: self.config.research_model.clone(),
                agent_index: agent.index,
                query: query.to_string(),
            })
            .collect();

        info!(agents = tasks.len(), query, "dispatching research agents");

        let providers: HashMap<u32, Arc<dyn ChatProvider>> = self
            .agents
            .iter()
            .map(|agent| (agent.index, agent.provider.clone()))
            .collect();
        let search = self.search.clone();
        let temperature = self.config.temperature;
        let max_turns = self.config.max_turns;
        let max_results = self.config.max_results;

        let collected = dispatch_research(tasks, self.config.max_workers, move |task| {
            let provider = providers.get(&task.agent_index).cloned();
            let search = search.clone();
            async move {
                let provider = provider.ok_or_else(|| {
                    ResearcherError::InvalidConfiguration(format!(
                        "no provider wired for agent {}",
                        task.agent_index
                    ))
                })?;
                let search_tool =
                    SearchTool::new(SearchClient::new(search, max_results));
                let runner = AgentRunner::new(
                    provider,
                    task.model.clone(),
                    research_system_prompt(task.agent_index),
                )
                .with_tool(Arc::new(search_tool))
                .with_temperature(temperature)
                .with_max_turns(max_turns);

                runner.run(&task.query).await
            }
        })
        .await?;

        send_phase(RunPhase::Aggregating);

        // The barrier has passed; surface the first unit failure, if any,
        // discarding sibling work for the run.
        let mut transcripts = Vec::with_capacity(collected.len());
        for (agent_index, outcome) in collected {
            transcripts.push((agent_index, outcome?));
        }

        let findings: Vec<Finding> = transcripts
            .iter()
            .filter_map(|(agent_index, transcript)| {
                transcript.final_assistant_message().map(|text| Finding {
                    agent_index: *agent_index,
                    text: text.to_string(),
                })
            })
            .collect();
        let corpus = assemble_corpus(&findings);

        info!(
            findings = findings.len(),
            corpus_chars = corpus.len(),
            "corpus assembled"
        );

        send_phase(RunPhase::Synthesizing);

        let synthesizer = AgentRunner::new(
            self.synthesis.clone(),
            self.config.synthesis_model.clone(),
            synthesis_instructions(&corpus),
        )
        .with_temperature(self.config.temperature)
        .with_max_turns(self.config.max_turns);

        let transcript = synthesizer.run(&synthesis_request(&corpus)).await?;
        let report = transcript
            .final_assistant_message()
            .ok_or(ResearcherError::NoReport)?
            .to_string();

        info!(report_chars = report.len(), "synthesis complete");

        Ok(RunOutcome { report, findings })
    }
}

#[async_trait]
impl ResearchEngine for ResearchSession {
    async fn run(&self, options: RunOptions) -> Result<RunOutcome, ResearcherError> {
        ResearchSession::run(self, options).await
    }
}

/// Engine that rebuilds the provider set from captured credentials on every
/// run; the worker pool and HTTP clients are ephemeral per run.
pub struct CredentialEngine {
    config: ResearchConfig,
    credentials: Credentials,
}

impl CredentialEngine {
    pub fn new(config: ResearchConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }
}

#[async_trait]
impl ResearchEngine for CredentialEngine {
    async fn run(&self, options: RunOptions) -> Result<RunOutcome, ResearcherError> {
        let session = ResearchSession::from_credentials(self.config.clone(), &self.credentials)?;
        session.run(options).await
    }
}
