use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use multiresearch_core::{
    Credentials, CredentialEngine, ReportExporter, ResearchConfig, ResearchEngine,
    ResearcherError, RunLogInput, RunOptions, RunPhase, log_run,
};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    service: Arc<ResearchService>,
    assets_dir: Arc<PathBuf>,
}

impl AppState {
    /// Wire the production state: credentials captured once, providers
    /// rebuilt per run.
    pub fn try_new(config: &AppConfig) -> Result<Self> {
        let credentials = Credentials::from_env();
        let engine = Arc::new(CredentialEngine::new(
            ResearchConfig::default(),
            credentials,
        ));
        Ok(Self::with_engine(config, engine))
    }

    /// Wire the state around an explicit engine (used by tests).
    pub fn with_engine(config: &AppConfig, engine: Arc<dyn ResearchEngine>) -> Self {
        let service = ResearchService::new(
            engine,
            ReportExporter::with_converter(&config.pdf_converter),
            config.pdf_path.clone(),
        );

        Self {
            service: Arc::new(service),
            assets_dir: Arc::new(config.assets_dir.clone()),
        }
    }

    pub fn research_service(&self) -> Arc<ResearchService> {
        self.service.clone()
    }

    pub fn assets_dir(&self) -> Arc<PathBuf> {
        self.assets_dir.clone()
    }
}

/// Marker returned when a run is refused because one is already in flight.
#[derive(Debug)]
pub struct AlreadyRunning;

/// Owns the single run slot: at most one run in flight, at most one stored
/// report, overwritten entirely by the next successful run.
pub struct ResearchService {
    engine: Arc<dyn ResearchEngine>,
    exporter: ReportExporter,
    pdf_path: PathBuf,
    slot: Arc<RwLock<RunSlot>>,
}

impl ResearchService {
    pub fn new(
        engine: Arc<dyn ResearchEngine>,
        exporter: ReportExporter,
        pdf_path: PathBuf,
    ) -> Self {
        Self {
            engine,
            exporter,
            pdf_path,
            slot: Arc::new(RwLock::new(RunSlot::Idle)),
        }
    }

    /// Start a run in the background. Refuses while another run holds the
    /// slot; any prior terminal state is overwritten.
    pub async fn start_run(&self, query: String) -> Result<RunSnapshot, AlreadyRunning> {
        let session_id = Uuid::new_v4().to_string();
        let (phase_tx, phase_rx) = watch::channel(RunPhase::Idle);

        {
            let mut slot = self.slot.write().await;
            if matches!(&*slot, RunSlot::Running { .. }) {
                return Err(AlreadyRunning);
            }
            *slot = RunSlot::Running {
                session_id: session_id.clone(),
                query: query.clone(),
                phase: phase_rx,
            };
        }

        let engine = self.engine.clone();
        let slot = self.slot.clone();
        let task_session_id = session_id.clone();

        tokio::spawn(async move {
            let options = RunOptions::new(query.clone()).with_progress(phase_tx);
            let result = engine.run(options).await;

            let mut guard = slot.write().await;
            match result {
                Ok(outcome) => {
                    info!(session_id = %task_session_id, "research run completed");
                    write_run_log(RunLogInput {
                        session_id: task_session_id.clone(),
                        query: query.clone(),
                        phase: RunPhase::Done.as_str().to_string(),
                        report_chars: outcome.report.len(),
                        agents_reporting: outcome.findings.len(),
                        error: None,
                    });
                    *guard = RunSlot::Completed {
                        session_id: task_session_id,
                        query,
                        report: Arc::new(outcome.report),
                        finished_at: Utc::now(),
                    };
                }
                Err(err) => {
                    error!(session_id = %task_session_id, error = %err, "research run failed");
                    write_run_log(RunLogInput {
                        session_id: task_session_id.clone(),
                        query: query.clone(),
                        phase: RunPhase::Failed.as_str().to_string(),
                        report_chars: 0,
                        agents_reporting: 0,
                        error: Some(err.to_string()),
                    });
                    *guard = RunSlot::Failed {
                        session_id: task_session_id,
                        query,
                        error: err.to_string(),
                    };
                }
            }
        });

        Ok(self.status().await)
    }

    pub async fn status(&self) -> RunSnapshot {
        let slot = self.slot.read().await;
        match &*slot {
            RunSlot::Idle => RunSnapshot {
                state: RunState::Idle,
                session_id: None,
                query: None,
                phase: None,
                error: None,
                report_available: false,
                finished_at: None,
            },
            RunSlot::Running {
                session_id,
                query,
                phase,
            } => RunSnapshot {
                state: RunState::Running,
                session_id: Some(session_id.clone()),
                query: Some(query.clone()),
                phase: Some(*phase.borrow()),
                error: None,
                report_available: false,
                finished_at: None,
            },
            RunSlot::Completed {
                session_id,
                query,
                finished_at,
                ..
            } => RunSnapshot {
                state: RunState::Completed,
                session_id: Some(session_id.clone()),
                query: Some(query.clone()),
                phase: Some(RunPhase::Done),
                error: None,
                report_available: true,
                finished_at: Some(*finished_at),
            },
            RunSlot::Failed {
                session_id,
                query,
                error,
            } => RunSnapshot {
                state: RunState::Failed,
                session_id: Some(session_id.clone()),
                query: Some(query.clone()),
                phase: Some(RunPhase::Failed),
                error: Some(error.clone()),
                report_available: false,
                finished_at: None,
            },
        }
    }

    /// The stored markdown report, if any.
    pub async fn report(&self) -> Option<Arc<String>> {
        let slot = self.slot.read().await;
        match &*slot {
            RunSlot::Completed { report, .. } => Some(report.clone()),
            _ => None,
        }
    }

    /// Export the stored report to the fixed PDF path and read it back for
    /// streaming. Overwrites the previous export.
    pub async fn export_report_pdf(&self) -> Result<Vec<u8>, ResearcherError> {
        let report = self.report().await.ok_or(ResearcherError::NoReport)?;

        let query = {
            let slot = self.slot.read().await;
            match &*slot {
                RunSlot::Completed { query, .. } => query.clone(),
                _ => "Research Report".to_string(),
            }
        };

        self.exporter
            .export_pdf(&report, &query, &self.pdf_path)
            .await?;
        tokio::fs::read(&self.pdf_path)
            .await
            .map_err(|err| ResearcherError::Export(err.to_string()))
    }

    pub fn pdf_filename(&self) -> String {
        self.pdf_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Research_Report.pdf".to_string())
    }
}

fn write_run_log(input: RunLogInput) {
    if let Err(err) = log_run(input) {
        warn!(error = %err, "failed to append run log");
    }
}

enum RunSlot {
    Idle,
    Running {
        session_id: String,
        query: String,
        phase: watch::Receiver<RunPhase>,
    },
    Completed {
        session_id: String,
        query: String,
        report: Arc<String>,
        finished_at: DateTime<Utc>,
    },
    Failed {
        session_id: String,
        query: String,
        error: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSnapshot {
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RunPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub report_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
