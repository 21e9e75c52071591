//! Route definitions for file path helpers.

use axum::routing::post;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// ```text
/// POST /browse         -> browse_open
/// POST /browse_save    -> browse_save
/// POST /validate       -> validate_path
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/browse", post(files::browse_open))
        .route("/browse_save", post(files::browse_save))
        .route("/validate", post(files::validate_path))
}
