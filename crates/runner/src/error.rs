use std::io;

use fuzzdeck_core::error::CoreError;
use fuzzdeck_core::job_state::JobState;

/// Errors reported synchronously by the job controller.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The configuration was rejected; nothing was spawned.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The slot is occupied; the request was not queued.
    #[error("Process already running ({0})")]
    AlreadyRunning(JobState),

    /// The engine could not be launched; the slot is now in `Error`.
    #[error("{}", spawn_message(.program, .source))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn spawn_message(program: &str, source: &io::Error) -> String {
    if source.kind() == io::ErrorKind::NotFound {
        format!("{program} not found. Make sure it is installed and in your PATH.")
    } else {
        format!("Failed to start {program}: {source}")
    }
}
