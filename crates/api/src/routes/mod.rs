pub mod files;
pub mod health;
pub mod jobs;
pub mod stream;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` control route tree.
///
/// Route hierarchy:
///
/// ```text
/// /run                 start a job (POST)
/// /stop                stop the running job (POST)
/// /status              job state and details (GET)
/// /results             newest-first result snapshot (GET)
/// /preview             build a command without running it (POST)
///
/// /browse              pick a wordlist file (POST)
/// /browse_save         pick an output file (POST)
/// /validate            check that a path is an existing file (POST)
/// ```
///
/// `/api/stream` is mounted separately by the app router so that the
/// request timeout does not cut it off.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .merge(files::router())
}
