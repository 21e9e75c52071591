//! Job controller: owns the single job slot and supervises the engine.
//!
//! [`JobController::start`] validates a configuration, claims the slot,
//! spawns the engine and hands the process to a supervisor task. The
//! supervisor drains engine output onto the [`EventBus`] in arrival order,
//! carries out stop requests (graceful first, forceful after a grace period)
//! and publishes exactly one terminal status when the process is gone.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fuzzdeck_core::config::{normalize, JobConfig, RawJobConfig};
use fuzzdeck_core::error::CoreError;
use fuzzdeck_core::event::{StreamEvent, TerminalStatus};
use fuzzdeck_core::invocation::{build_invocation, Invocation};
use fuzzdeck_core::job_state::JobState;
use fuzzdeck_core::types::{JobId, Timestamp};
use fuzzdeck_events::{EventBus, JobPublisher, ResultStore, Subscription};
use serde::Serialize;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::Instant;

use crate::error::JobError;
use crate::process::{ExitReport, ProcessSpawner, SpawnedProcess};
use crate::slot::{JobRecord, JobSlot, JobStatusView};

/// Default time a stopped process gets to exit before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// How long output is still drained after the process has exited.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub stop_grace: Duration,
    pub drain_grace: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            stop_grace: DEFAULT_STOP_GRACE,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

/// Returned by a successful [`JobController::start`].
#[derive(Debug, Clone, Serialize)]
pub struct JobHandle {
    pub job_id: JobId,
    /// Display form of the command line (quoted, never executed).
    pub command: String,
    /// Exact argument vector handed to the engine.
    pub args: Vec<String>,
    pub started_at: Timestamp,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A termination request was sent.
    Stopping,
    /// A stop is already in progress; nothing new was sent.
    AlreadyStopping,
    /// No running job; the slot is in the given state.
    NotRunning(JobState),
}

struct Inner {
    spawner: Arc<dyn ProcessSpawner>,
    bus: Arc<EventBus>,
    store: Arc<ResultStore>,
    settings: ControllerSettings,
    slot: Mutex<JobSlot>,
    state: watch::Receiver<JobState>,
}

/// Cheaply cloneable handle to the job controller.
#[derive(Clone)]
pub struct JobController {
    inner: Arc<Inner>,
}

impl JobController {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        bus: Arc<EventBus>,
        store: Arc<ResultStore>,
        settings: ControllerSettings,
    ) -> Self {
        let slot = JobSlot::new();
        let state = slot.watch();
        Self {
            inner: Arc::new(Inner {
                spawner,
                bus,
                store,
                settings,
                slot: Mutex::new(slot),
                state,
            }),
        }
    }

    pub fn program(&self) -> &str {
        self.inner.spawner.program()
    }

    /// Current slot state. Never waits on the slot lock or process I/O.
    pub fn status(&self) -> JobState {
        *self.inner.state.borrow()
    }

    /// State plus details of the current or last job.
    pub async fn snapshot(&self) -> JobStatusView {
        self.inner.slot.lock().await.view()
    }

    /// Attach a live observer.
    ///
    /// The returned state and subscription are taken under the slot lock, so
    /// an active state guarantees the job's terminal event is still ahead of
    /// the subscription. While a job is active the subscription only follows
    /// that job.
    pub async fn subscribe(&self) -> (JobState, Subscription) {
        let slot = self.inner.slot.lock().await;
        let subscription = match slot.active_job() {
            Some(job_id) => self.inner.bus.subscribe_job(job_id),
            None => self.inner.bus.subscribe(),
        };
        (slot.state(), subscription)
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.inner.store
    }

    /// Wait until no job occupies the slot and return the settled state.
    pub async fn wait_until_settled(&self) -> JobState {
        let mut rx = self.inner.state.clone();
        let settled = match rx.wait_for(|state| !state.is_active()).await {
            Ok(state) => *state,
            Err(_) => self.status(),
        };
        settled
    }

    /// Normalize and build the invocation for `raw` without starting it.
    pub fn preview(&self, raw: &RawJobConfig) -> Result<(JobConfig, Invocation), CoreError> {
        let config = normalize(raw)?;
        let invocation = build_invocation(&config);
        Ok((config, invocation))
    }

    /// Start a job.
    ///
    /// Fails with [`JobError::Validation`] before touching the slot, with
    /// [`JobError::AlreadyRunning`] when the slot is occupied, and with
    /// [`JobError::Spawn`] when the engine cannot be launched.
    pub async fn start(&self, raw: &RawJobConfig) -> Result<JobHandle, JobError> {
        let (config, invocation) = self.preview(raw)?;
        ensure_wordlists_exist(&config).await?;

        let program = self.program().to_string();
        let command = invocation.display(&program);
        let args = invocation.process_args();

        let job_id = uuid::Uuid::new_v4();
        {
            let mut slot = self.inner.slot.lock().await;
            slot.transition(&JobState::STARTABLE, JobState::Starting)
                .map_err(JobError::AlreadyRunning)?;
            slot.claim(job_id);
        }

        self.inner.store.begin_job(job_id);
        let mut publisher = self.inner.bus.publisher(job_id);

        tracing::info!(job_id = %job_id, command = %command, "Starting job");

        let process = match self.inner.spawner.spawn(&args).await {
            Ok(process) => process,
            Err(source) => {
                let err = JobError::Spawn { program, source };
                tracing::error!(job_id = %job_id, error = %err, "Engine failed to spawn");
                let mut slot = self.inner.slot.lock().await;
                publisher.publish(StreamEvent::Error(err.to_string()));
                publisher.publish(StreamEvent::Status(TerminalStatus::Finished));
                let _ = slot.transition(&[JobState::Starting], JobState::Error);
                return Err(err);
            }
        };

        let started_at = Utc::now();
        let stop_signal = Arc::new(Notify::new());
        {
            let mut slot = self.inner.slot.lock().await;
            slot.install(JobRecord {
                job_id,
                command: command.clone(),
                pid: process.pid,
                started_at,
                ended_at: None,
                stop_signal: Arc::clone(&stop_signal),
            });
            let _ = slot.transition(&[JobState::Starting], JobState::Running);
        }

        publisher.publish(StreamEvent::LogLine(format!("Started: {command}")));
        tokio::spawn(supervise(
            Arc::clone(&self.inner),
            process,
            publisher,
            stop_signal,
        ));

        Ok(JobHandle {
            job_id,
            command,
            args,
            started_at,
        })
    }

    /// Request the running job to stop. Idempotent.
    pub async fn stop(&self) -> StopOutcome {
        let mut slot = self.inner.slot.lock().await;
        match slot.transition(&[JobState::Running], JobState::Stopping) {
            Ok(_) => {
                if let Some(record) = slot.record() {
                    tracing::info!(job_id = %record.job_id, "Stop requested");
                    record.stop_signal.notify_one();
                }
                StopOutcome::Stopping
            }
            Err(JobState::Stopping) => StopOutcome::AlreadyStopping,
            Err(state) => StopOutcome::NotRunning(state),
        }
    }

    /// Stop any running job and wait, bounded, for the slot to settle.
    pub async fn shutdown(&self, timeout: Duration) {
        self.stop().await;
        if tokio::time::timeout(timeout, self.wait_until_settled())
            .await
            .is_err()
        {
            tracing::warn!("Job did not settle before shutdown timeout");
        }
    }
}

/// Every wordlist must be an existing regular file.
async fn ensure_wordlists_exist(config: &JobConfig) -> Result<(), CoreError> {
    for wl in &config.wordlists {
        let is_file = tokio::fs::metadata(&wl.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(CoreError::Validation(format!(
                "Wordlist file not found: {}",
                wl.path
            )));
        }
    }
    Ok(())
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drive one job from spawn to its terminal status.
async fn supervise(
    inner: Arc<Inner>,
    process: SpawnedProcess,
    mut publisher: JobPublisher,
    stop_signal: Arc<Notify>,
) {
    let job_id = publisher.job_id();
    let SpawnedProcess {
        pid,
        mut output,
        mut control,
    } = process;

    let mut output_open = true;
    let mut exit: Option<io::Result<ExitReport>> = None;
    let mut stop_requested = false;
    // Set only when a termination signal reached a live process.
    let mut terminated = false;
    let mut kill_at: Option<Instant> = None;
    let mut drain_until: Option<Instant> = None;

    while output_open || exit.is_none() {
        tokio::select! {
            line = output.recv(), if output_open => match line {
                Some(line) => {
                    if let Some(event) = StreamEvent::from_output_line(&line) {
                        publisher.publish(event);
                    }
                }
                None => output_open = false,
            },

            _ = stop_signal.notified(), if !stop_requested => {
                stop_requested = true;
                if exit.is_none() {
                    tracing::info!(job_id = %job_id, pid, "Sending graceful termination");
                    if let Err(e) = control.terminate() {
                        tracing::warn!(job_id = %job_id, error = %e, "Graceful termination failed");
                    }
                    terminated = true;
                    kill_at = Some(Instant::now() + inner.settings.stop_grace);
                }
            },

            _ = sleep_until_opt(kill_at), if exit.is_none() => {
                kill_at = None;
                tracing::warn!(
                    job_id = %job_id,
                    pid,
                    grace_ms = inner.settings.stop_grace.as_millis() as u64,
                    "Engine ignored termination, killing",
                );
                if let Err(e) = control.kill() {
                    tracing::error!(job_id = %job_id, error = %e, "Forceful termination failed");
                }
            },

            status = control.wait(), if exit.is_none() => {
                exit = Some(status);
                kill_at = None;
                drain_until = Some(Instant::now() + inner.settings.drain_grace);
            },

            _ = sleep_until_opt(drain_until), if output_open => {
                tracing::warn!(job_id = %job_id, "Engine output still open after exit, abandoning it");
                output_open = false;
            },
        }
    }

    let mut slot = inner.slot.lock().await;
    // A stop that arrives after the engine exited on its own does not change
    // how the job ended.
    let stopped = terminated;

    let final_state = match exit {
        Some(Ok(report)) => {
            tracing::info!(job_id = %job_id, %report, stopped, "Engine exited");
            if !report.success && !stopped {
                publisher.publish(StreamEvent::LogLine(format!("Process exited with {report}")));
            }
            JobState::Finished
        }
        Some(Err(e)) => {
            tracing::error!(job_id = %job_id, error = %e, "Lost track of engine process");
            publisher.publish(StreamEvent::Error(format!("Failed to wait for process: {e}")));
            JobState::Error
        }
        None => JobState::Error,
    };

    let terminal = if stopped {
        TerminalStatus::Stopped
    } else {
        TerminalStatus::Finished
    };
    publisher.publish(StreamEvent::Status(terminal));

    slot.mark_ended(Utc::now());
    if let Err(current) = slot.transition(&[JobState::Running, JobState::Stopping], final_state) {
        tracing::error!(job_id = %job_id, %current, "Job slot in unexpected state at exit");
    }
}
