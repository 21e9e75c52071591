//! Server-sent event stream of the current job.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive};
use axum::response::Sse;
use futures::{Stream, StreamExt};
use fuzzdeck_core::event::{StreamEvent, TerminalStatus};
use fuzzdeck_events::JobEvent;

use crate::state::AppState;

/// Interval between keep-alive comments on an idle stream.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// GET /api/stream
///
/// One `data:` frame per event as `{"type", "data"}`, ending after the job's
/// terminal status. With no active job a single `finished` status is sent
/// and the stream closes.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (job_state, subscription) = state.controller.subscribe().await;

    let events = if job_state.is_active() {
        tracing::debug!(subscriber = %subscription.id(), %job_state, "Stream observer attached");
        subscription.into_stream().map(job_event_to_sse).left_stream()
    } else {
        drop(subscription);
        let finished = StreamEvent::Status(TerminalStatus::Finished);
        futures::stream::once(async move { stream_event_to_sse(&finished) }).right_stream()
    };

    Sse::new(events.map(Ok)).keep_alive(default_keep_alive())
}

fn job_event_to_sse(event: JobEvent) -> Event {
    stream_event_to_sse(&event.event).id(event.seq.to_string())
}

fn stream_event_to_sse(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().data(data),
        Err(err) => {
            tracing::warn!(error = %err, kind = event.kind(), "Failed to encode stream event");
            Event::default().data(r#"{"type":"error","data":"event encoding failed"}"#)
        }
    }
}

fn default_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(KEEP_ALIVE_INTERVAL)
        .text("keep-alive")
}
