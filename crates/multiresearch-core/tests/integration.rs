//! End-to-end workflow scenarios with scripted providers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use multiresearch_core::{
    AssistantTurn, ChatProvider, ChatRequest, ResearchConfig, ResearchSession, ResearcherError,
    RunOptions, RunPhase, SearchBackend, SearchResult,
};
use tokio::sync::watch;

/// Provider that always answers with the same text (or error) and records
/// every request it receives.
struct FixedProvider {
    answer: Option<String>,
    failure: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FixedProvider {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text.to_string()),
            failure: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            failure: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn recorded_text(&self) -> String {
        let requests = self.requests.lock().unwrap();
        requests
            .iter()
            .flat_map(|request| request.messages.iter())
            .map(|message| message.content.clone())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}

#[async_trait]
impl ChatProvider for FixedProvider {
    async fn complete(&self, request: ChatRequest) -> Result<AssistantTurn, ResearcherError> {
        self.requests.lock().unwrap().push(request);
        if let Some(message) = &self.failure {
            return Err(ResearcherError::provider("fixed", message.clone()));
        }
        Ok(AssistantTurn {
            content: self.answer.clone(),
            tool_calls: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct EmptySearch;

#[async_trait]
impl SearchBackend for EmptySearch {
    async fn search(
        &self,
        _query: &str,
        _count: usize,
    ) -> Result<Vec<SearchResult>, ResearcherError> {
        Ok(Vec::new())
    }
}

fn session(
    research: Vec<Arc<FixedProvider>>,
    synthesis: Arc<FixedProvider>,
) -> ResearchSession {
    let config = ResearchConfig {
        research_agents: research.len(),
        ..ResearchConfig::default()
    };
    let providers = research
        .into_iter()
        .map(|provider| provider as Arc<dyn ChatProvider>)
        .collect();
    ResearchSession::new(config, providers, synthesis, Arc::new(EmptySearch)).unwrap()
}

#[tokio::test]
async fn empty_query_is_rejected_before_dispatch() {
    let agent_one = FixedProvider::answering("A");
    let agent_two = FixedProvider::answering("B");
    let synthesis = FixedProvider::answering("# Report");
    let session = session(vec![agent_one.clone(), agent_two.clone()], synthesis.clone());

    let err = session.run(RunOptions::new("   ")).await.unwrap_err();
    assert!(matches!(err, ResearcherError::EmptyQuery));

    assert_eq!(agent_one.request_count(), 0);
    assert_eq!(agent_two.request_count(), 0);
    assert_eq!(synthesis.request_count(), 0);
}

#[tokio::test]
async fn two_agents_feed_the_synthesis_corpus() {
    let agent_one = FixedProvider::answering("A");
    let agent_two = FixedProvider::answering("B");
    let synthesis = FixedProvider::answering("# Final Report");
    let session = session(vec![agent_one.clone(), agent_two.clone()], synthesis.clone());

    let outcome = session
        .run(RunOptions::new("What is LangGraph?"))
        .await
        .unwrap();

    assert_eq!(outcome.report, "# Final Report");
    assert_eq!(outcome.findings.len(), 2);

    // Ordering follows completion and is not guaranteed; the corpus is one
    // of the two joins.
    let seen = synthesis.recorded_text();
    assert!(
        seen.contains("A\n\nB") || seen.contains("B\n\nA"),
        "synthesis prompt did not embed the corpus: {seen}"
    );
}

#[tokio::test]
async fn each_agent_receives_its_own_agent_number() {
    let agent_one = FixedProvider::answering("A");
    let agent_two = FixedProvider::answering("B");
    let synthesis = FixedProvider::answering("# Report");
    let session = session(vec![agent_one.clone(), agent_two.clone()], synthesis);

    session
        .run(RunOptions::new("What is LangGraph?"))
        .await
        .unwrap();

    assert!(agent_one.recorded_text().contains("YOUR AGENT NUMBER: 1"));
    assert!(agent_two.recorded_text().contains("YOUR AGENT NUMBER: 2"));
    assert_eq!(agent_one.request_count(), 1);
    assert_eq!(agent_two.request_count(), 1);
}

#[tokio::test]
async fn agents_without_extractable_output_contribute_nothing() {
    let agent_one = FixedProvider::answering("A");
    // Whitespace-only output never reaches the corpus.
    let agent_two = FixedProvider::answering("   ");
    let synthesis = FixedProvider::answering("# Report");
    let session = session(vec![agent_one, agent_two], synthesis.clone());

    let outcome = session.run(RunOptions::new("q")).await.unwrap();

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].text, "A");
    // The embedded corpus is exactly "A" — the silent agent left no trace.
    assert!(
        synthesis
            .recorded_text()
            .contains("RESEARCH FINDINGS:\nA\n\nGenerate the complete report")
    );
}

#[tokio::test]
async fn one_failing_agent_aborts_the_run() {
    let agent_one = FixedProvider::failing("quota exhausted");
    let agent_two = FixedProvider::answering("B");
    let synthesis = FixedProvider::answering("# Report");
    let session = session(vec![agent_one, agent_two.clone()], synthesis.clone());

    let err = session.run(RunOptions::new("q")).await.unwrap_err();
    assert!(matches!(err, ResearcherError::Provider { .. }));

    // The sibling ran to completion, but its work is discarded: synthesis
    // never starts and no report is produced.
    assert_eq!(agent_two.request_count(), 1);
    assert_eq!(synthesis.request_count(), 0);
}

#[tokio::test]
async fn synthesis_without_usable_output_yields_no_report() {
    let agent_one = FixedProvider::answering("A");
    let agent_two = FixedProvider::answering("B");
    let synthesis = FixedProvider::answering("");
    let session = session(vec![agent_one, agent_two], synthesis);

    let err = session.run(RunOptions::new("q")).await.unwrap_err();
    assert!(matches!(err, ResearcherError::NoReport));
}

#[tokio::test]
async fn phase_gauge_ends_in_done_or_failed() {
    let synthesis = FixedProvider::answering("# Report");
    let session = session(
        vec![FixedProvider::answering("A"), FixedProvider::answering("B")],
        synthesis,
    );

    let (tx, rx) = watch::channel(RunPhase::Idle);
    session
        .run(RunOptions::new("q").with_progress(tx))
        .await
        .unwrap();
    assert_eq!(*rx.borrow(), RunPhase::Done);

    let failing = session_with_failure();
    let (tx, rx) = watch::channel(RunPhase::Idle);
    failing
        .run(RunOptions::new("q").with_progress(tx))
        .await
        .unwrap_err();
    assert_eq!(*rx.borrow(), RunPhase::Failed);
}

fn session_with_failure() -> ResearchSession {
    session(
        vec![
            FixedProvider::failing("boom"),
            FixedProvider::answering("B"),
        ],
        FixedProvider::answering("# Report"),
    )
}
