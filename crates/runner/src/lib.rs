//! Engine process supervision for fuzzdeck.
//!
//! The [`JobController`] owns the single job slot: it validates and starts
//! an engine run, streams its output onto the event bus, and carries out
//! stop requests. Process launching sits behind [`ProcessSpawner`] so tests
//! can drive the controller without a real engine.

pub mod controller;
pub mod error;
pub mod process;
pub mod slot;

pub use controller::{ControllerSettings, JobController, JobHandle, StopOutcome};
pub use error::JobError;
pub use process::{CommandSpawner, ExitReport, ProcessControl, ProcessSpawner, SpawnedProcess};
pub use slot::JobStatusView;
