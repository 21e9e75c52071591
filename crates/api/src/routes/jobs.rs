//! Route definitions for job control.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// ```text
/// POST /run        -> run_job
/// POST /stop       -> stop_job
/// GET  /status     -> job_status
/// GET  /results    -> list_results
/// POST /preview    -> preview_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(jobs::run_job))
        .route("/stop", post(jobs::stop_job))
        .route("/status", get(jobs::job_status))
        .route("/results", get(jobs::list_results))
        .route("/preview", post(jobs::preview_job))
}
