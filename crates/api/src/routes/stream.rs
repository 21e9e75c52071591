use axum::routing::get;
use axum::Router;

use crate::handlers::stream;
use crate::state::AppState;

/// Live event stream, mounted at the root with its full path.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/stream", get(stream::stream_events))
}
