use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use multiresearch_core::{
    ResearchEngine, ResearcherError, RunOptions, RunOutcome, RunPhase,
};
use multiresearch_gui::config::AppConfig;
use multiresearch_gui::routes::build_router;
use multiresearch_gui::state::AppState;
use serde_json::json;
use tokio::time::{Duration, sleep, timeout};
use uuid::Uuid;

/// Engine stub that skips the provider fleet entirely.
struct StubEngine {
    delay_ms: u64,
    fail: bool,
}

impl StubEngine {
    fn quick() -> Arc<Self> {
        Arc::new(Self {
            delay_ms: 0,
            fail: false,
        })
    }

    fn slow(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            delay_ms,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            delay_ms: 0,
            fail: true,
        })
    }
}

#[async_trait]
impl ResearchEngine for StubEngine {
    async fn run(&self, options: RunOptions) -> Result<RunOutcome, ResearcherError> {
        if let Some(progress) = &options.progress {
            let _ = progress.send(RunPhase::Dispatching);
        }
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            return Err(ResearcherError::provider("stub", "provider unavailable"));
        }
        Ok(RunOutcome {
            report: format!("# Report\n\nFindings for: {}", options.query.trim()),
            findings: Vec::new(),
        })
    }
}

fn base_config() -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".into(),
        assets_dir: PathBuf::from("assets"),
        pdf_path: std::env::temp_dir().join(format!("multiresearch-test-{}.pdf", Uuid::new_v4())),
        pdf_converter: "cp".into(),
    }
}

fn server(engine: Arc<dyn ResearchEngine>) -> TestServer {
    let state = AppState::with_engine(&base_config(), engine);
    TestServer::new(build_router(state)).unwrap()
}

async fn wait_for_terminal_state(server: &TestServer) -> serde_json::Value {
    timeout(Duration::from_secs(5), async {
        loop {
            let response = server.get("/api/research").await;
            assert_eq!(response.status_code(), 200);
            let payload = response.json::<serde_json::Value>();
            if payload["state"] == "completed" || payload["state"] == "failed" {
                return payload;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("run did not reach a terminal state in time")
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = server(StubEngine::quick());

    let response = server.get("/health/live").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");

    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<serde_json::Value>()["run_state"], "idle");
}

#[tokio::test]
async fn empty_query_is_rejected_without_starting_a_run() {
    let server = server(StubEngine::quick());

    let response = server.post("/api/research").json(&json!({"query": "   "})).await;
    assert_eq!(response.status_code(), 400);

    let status = server.get("/api/research").await.json::<serde_json::Value>();
    assert_eq!(status["state"], "idle");

    let report = server.get("/api/report").await;
    assert_eq!(report.status_code(), 404);
}

#[tokio::test]
async fn successful_run_stores_and_serves_the_report() {
    let server = server(StubEngine::quick());

    let response = server
        .post("/api/research")
        .json(&json!({"query": "What is LangGraph?"}))
        .await;
    assert_eq!(response.status_code(), 202);

    let terminal = wait_for_terminal_state(&server).await;
    assert_eq!(terminal["state"], "completed");
    assert_eq!(terminal["report_available"], true);

    let report = server.get("/api/report").await;
    assert_eq!(report.status_code(), 200);
    let body = report.text();
    assert!(body.contains("What is LangGraph?"));
}

#[tokio::test]
async fn concurrent_run_is_refused() {
    let server = server(StubEngine::slow(300));

    let first = server
        .post("/api/research")
        .json(&json!({"query": "first"}))
        .await;
    assert_eq!(first.status_code(), 202);

    let second = server
        .post("/api/research")
        .json(&json!({"query": "second"}))
        .await;
    assert_eq!(second.status_code(), 409);

    let terminal = wait_for_terminal_state(&server).await;
    assert_eq!(terminal["query"], "first");
}

#[tokio::test]
async fn failed_run_stores_no_report() {
    let server = server(StubEngine::failing());

    let response = server
        .post("/api/research")
        .json(&json!({"query": "doomed"}))
        .await;
    assert_eq!(response.status_code(), 202);

    let terminal = wait_for_terminal_state(&server).await;
    assert_eq!(terminal["state"], "failed");
    assert!(
        terminal["error"]
            .as_str()
            .unwrap_or_default()
            .contains("provider unavailable")
    );
    assert_eq!(terminal["report_available"], false);

    let report = server.get("/api/report").await;
    assert_eq!(report.status_code(), 404);
}

#[tokio::test]
async fn second_run_overwrites_the_first_report() {
    let server = server(StubEngine::quick());

    server
        .post("/api/research")
        .json(&json!({"query": "alpha"}))
        .await;
    wait_for_terminal_state(&server).await;

    server
        .post("/api/research")
        .json(&json!({"query": "beta"}))
        .await;
    wait_for_terminal_state(&server).await;

    let body = server.get("/api/report").await.text();
    assert!(body.contains("beta"));
    assert!(!body.contains("alpha"));
}

#[tokio::test]
async fn pdf_download_streams_the_exported_artifact() {
    let server = server(StubEngine::quick());

    // Without a report the export has nothing to work with.
    let missing = server.get("/api/report/pdf").await;
    assert_eq!(missing.status_code(), 404);

    server
        .post("/api/research")
        .json(&json!({"query": "export me"}))
        .await;
    wait_for_terminal_state(&server).await;

    let response = server.get("/api/report/pdf").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/pdf"
    );
    assert!(
        response
            .header("content-disposition")
            .to_str()
            .unwrap()
            .contains("attachment")
    );
    // The `cp` converter used in tests copies the rendered HTML through.
    assert!(response.text().starts_with("<!DOCTYPE html>"));
}

#[tokio::test]
async fn static_page_is_served_at_the_root() {
    let server = server(StubEngine::quick());

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);
    let body = response.text();
    assert!(body.contains("Multi-Agent AI Researcher"));
}
