//! Lifecycle states of the single job slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-wide state of the job slot.
///
/// Only the runner's job controller moves the slot between states; everyone
/// else reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// No job has run since the server started.
    Idle,
    /// The slot is claimed and the engine process is being spawned.
    Starting,
    /// The engine process is alive and its output is being drained.
    Running,
    /// A stop was requested; waiting for the process to exit.
    Stopping,
    /// The last job exited (on its own or after a stop).
    Finished,
    /// The last job could not be spawned or supervised.
    Error,
}

impl JobState {
    /// States from which a new job may be started.
    pub const STARTABLE: [JobState; 3] = [JobState::Idle, JobState::Finished, JobState::Error];

    /// `true` while a job occupies the slot.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }

    /// Lowercase wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
