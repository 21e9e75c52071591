use std::sync::Arc;

use fuzzdeck_runner::JobController;

use crate::picker::PathPicker;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc` or is a handle.
#[derive(Clone)]
pub struct AppState {
    /// The single-job controller; also owns the event bus and result store.
    pub controller: JobController,
    /// Dialog backend for the browse endpoints.
    pub picker: Arc<dyn PathPicker>,
}
