//! Handlers for job control: run, stop, status, results and preview.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fuzzdeck_core::config::RawJobConfig;
use fuzzdeck_core::job_state::JobState;
use fuzzdeck_core::record::ResultRecord;
use fuzzdeck_core::types::{JobId, Timestamp};
use fuzzdeck_runner::StopOutcome;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Outcome of a run request, used for both acceptance and rejection.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub accepted: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// `stopping` or `not_running`.
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub result_count: usize,
    /// Events the result collector skipped; results may be incomplete when
    /// this is non-zero.
    pub missed_events: u64,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    /// Arguments exactly as the engine receives them.
    pub argv: Vec<String>,
    /// Display form of the command line.
    pub command: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/run
///
/// Starts a job. Rejections keep the `accepted`/`message` shape so the form
/// can show the reason inline.
pub async fn run_job(
    State(state): State<AppState>,
    payload: Result<Json<RawJobConfig>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(raw)) => state.controller.start(&raw).await.map_err(AppError::from),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    };

    match result {
        Ok(handle) => Json(RunResponse {
            accepted: true,
            message: "Scan started".to_string(),
            job_id: Some(handle.job_id),
            command: Some(handle.command),
            code: None,
        })
        .into_response(),
        Err(err) => {
            let (status, code, message) = err.classify();
            tracing::info!(%status, code, %message, "Run request rejected");
            let body = RunResponse {
                accepted: false,
                message,
                job_id: None,
                command: None,
                code: Some(code),
            };
            (status, Json(body)).into_response()
        }
    }
}

/// POST /api/stop
///
/// Always succeeds; repeated calls while stopping are acknowledged without
/// sending another termination request.
pub async fn stop_job(State(state): State<AppState>) -> Json<StopResponse> {
    let status = match state.controller.stop().await {
        StopOutcome::Stopping | StopOutcome::AlreadyStopping => "stopping",
        StopOutcome::NotRunning(_) => "not_running",
    };
    Json(StopResponse { status })
}

/// GET /api/status
pub async fn job_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let view = state.controller.snapshot().await;
    Json(StatusResponse {
        state: view.state,
        job_id: view.job_id,
        started_at: view.started_at,
        ended_at: view.ended_at,
        command: view.command,
        result_count: state.controller.store().len(),
        missed_events: state.controller.store().missed(),
    })
}

/// GET /api/results
pub async fn list_results(
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<ResultRecord>>> {
    Json(DataResponse {
        data: state.controller.store().snapshot(),
    })
}

/// POST /api/preview
pub async fn preview_job(
    State(state): State<AppState>,
    payload: Result<Json<RawJobConfig>, JsonRejection>,
) -> AppResult<Json<PreviewResponse>> {
    let Json(raw) = payload.map_err(|r| AppError::BadRequest(r.body_text()))?;
    let (_, invocation) = state.controller.preview(&raw)?;
    Ok(Json(PreviewResponse {
        argv: invocation.process_args(),
        command: invocation.display(state.controller.program()),
    }))
}
