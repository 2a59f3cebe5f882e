use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::state::{AppState, RunSnapshot};

#[derive(Debug, Deserialize)]
pub struct StartResearchRequest {
    pub query: String,
}

pub fn research_router() -> Router<AppState> {
    Router::new()
        .route("/research", post(start_research).get(research_status))
        .route("/report", get(get_report))
        .route("/report/pdf", get(download_report_pdf))
}

#[instrument(skip_all)]
async fn start_research(
    State(state): State<AppState>,
    Json(payload): Json<StartResearchRequest>,
) -> Result<(StatusCode, Json<RunSnapshot>), AppError> {
    if payload.query.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "query must not be empty",
        ));
    }

    let service = state.research_service();
    match service.start_run(payload.query).await {
        Ok(snapshot) => Ok((StatusCode::ACCEPTED, Json(snapshot))),
        Err(_) => Err(AppError::new(
            StatusCode::CONFLICT,
            "a research run is already in flight",
        )),
    }
}

async fn research_status(State(state): State<AppState>) -> Json<RunSnapshot> {
    Json(state.research_service().status().await)
}

async fn get_report(State(state): State<AppState>) -> Result<Response, AppError> {
    match state.research_service().report().await {
        Some(report) => Ok((
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            report.as_str().to_string(),
        )
            .into_response()),
        None => Err(AppError::new(StatusCode::NOT_FOUND, "no report available")),
    }
}

async fn download_report_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let service = state.research_service();
    let bytes = service.export_report_pdf().await.map_err(AppError::from)?;

    let disposition = format!("attachment; filename=\"{}\"", service.pdf_filename());
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
