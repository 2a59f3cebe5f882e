use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::{AppState, RunState};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    run_state: RunState,
}

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
}

async fn live(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(build_response(state).await)
}

async fn ready(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(build_response(state).await)
}

async fn build_response(state: AppState) -> HealthResponse {
    let snapshot = state.research_service().status().await;
    let status = if snapshot.state == RunState::Running {
        "busy"
    } else {
        "ok"
    };
    HealthResponse {
        status,
        run_state: snapshot.state,
    }
}
