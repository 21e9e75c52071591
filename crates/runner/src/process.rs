//! External engine process abstraction.
//!
//! [`ProcessSpawner`] launches the engine with an argument vector (never
//! through a shell) and hands back a [`SpawnedProcess`]: a channel of output
//! lines in arrival order plus a [`ProcessControl`] for termination and exit
//! observation. [`CommandSpawner`] is the `tokio::process` implementation.

use std::fmt;
use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Lines buffered between the pipe readers and the supervisor.
const OUTPUT_BUFFER: usize = 256;

/// Longest chunk forwarded as one line. Longer output without a newline
/// (carriage-return progress bars) is split at this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Control half of a running engine process.
#[async_trait]
pub trait ProcessControl: Send {
    /// Ask the process to exit (SIGTERM on Unix).
    fn terminate(&mut self) -> io::Result<()>;

    /// Kill the process outright.
    fn kill(&mut self) -> io::Result<()>;

    /// Wait for the process to exit. Must be cancel-safe: it is polled
    /// inside `select!` and may be dropped and re-created.
    async fn wait(&mut self) -> io::Result<ExitReport>;
}

/// A freshly spawned engine process.
pub struct SpawnedProcess {
    pub pid: Option<u32>,
    /// Stdout and stderr lines, in the order they were read. Closes once
    /// both pipes reach end of file.
    pub output: mpsc::Receiver<String>,
    pub control: Box<dyn ProcessControl>,
}

/// Launches the engine.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Program name shown in command previews and logs.
    fn program(&self) -> &str;

    async fn spawn(&self, args: &[String]) -> io::Result<SpawnedProcess>;
}

// ---------------------------------------------------------------------------
// tokio::process implementation
// ---------------------------------------------------------------------------

/// Spawns `program` directly with piped stdout/stderr.
#[derive(Debug, Clone)]
pub struct CommandSpawner {
    program: String,
}

impl CommandSpawner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ProcessSpawner for CommandSpawner {
    fn program(&self) -> &str {
        &self.program
    }

    async fn spawn(&self, args: &[String]) -> io::Result<SpawnedProcess> {
        // `kill_on_drop(true)` guarantees the child dies with its handle.
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id();
        let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone(), MAX_LINE_BYTES));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx, MAX_LINE_BYTES));
        }

        tracing::debug!(program = %self.program, pid, "Engine process spawned");

        Ok(SpawnedProcess {
            pid,
            output: rx,
            control: Box::new(ChildControl { child, pid }),
        })
    }
}

/// Read `pipe` line by line into `tx` until EOF or the receiver goes away.
///
/// Invalid UTF-8 is replaced rather than ending the stream. A line longer
/// than `max_line` bytes is forwarded in `max_line` sized pieces.
async fn forward_lines<R: AsyncRead + Unpin>(pipe: R, tx: mpsc::Sender<String>, max_line: usize) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = (&mut reader)
            .take(max_line as u64)
            .read_until(b'\n', &mut buf)
            .await;
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Engine output pipe read failed");
                break;
            }
        }
    }
}

struct ChildControl {
    child: Child,
    pid: Option<u32>,
}

#[async_trait]
impl ProcessControl for ChildControl {
    fn terminate(&mut self) -> io::Result<()> {
        match self.pid {
            Some(pid) => send_sigterm(&mut self.child, pid),
            None => Ok(()),
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.start_kill() {
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    async fn wait(&mut self) -> io::Result<ExitReport> {
        let status = self.child.wait().await?;
        self.pid = None;
        Ok(ExitReport {
            code: status.code(),
            success: status.success(),
        })
    }
}

#[cfg(unix)]
fn send_sigterm(_child: &mut Child, pid: u32) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // Safety: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child we have not reaped yet (`pid` is cleared after `wait`).
    let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.start_kill()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Helper to create a temporary executable shell script from the given body.
    fn write_temp_script(body: &str) -> tempfile::TempPath {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let mut f = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp file");
        writeln!(f, "#!/bin/sh").expect("write shebang");
        write!(f, "{body}").expect("write body");
        let path = f.into_temp_path();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make script executable");
        path
    }

    async fn collect_output(process: &mut SpawnedProcess) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = process.output.recv().await {
            lines.push(line.trim_end().to_string());
        }
        lines
    }

    #[tokio::test]
    async fn passes_arguments_without_a_shell() {
        let script = write_temp_script("for a in \"$@\"; do echo \"[$a]\"; done\n");
        let spawner = CommandSpawner::new(script.to_str().expect("path"));
        let args = vec!["-H".to_string(), "X: $(whoami); echo pwned".to_string()];

        let mut process = spawner.spawn(&args).await.expect("spawn");
        let lines = collect_output(&mut process).await;
        let report = process.control.wait().await.expect("wait");

        assert!(report.success);
        assert_eq!(lines, ["[-H]", "[X: $(whoami); echo pwned]"]);
    }

    #[tokio::test]
    async fn merges_stdout_and_stderr() {
        let script = write_temp_script("echo out\necho err >&2\nexit 3\n");
        let spawner = CommandSpawner::new(script.to_str().expect("path"));

        let mut process = spawner.spawn(&[]).await.expect("spawn");
        let mut lines = collect_output(&mut process).await;
        lines.sort();
        let report = process.control.wait().await.expect("wait");

        assert_eq!(lines, ["err", "out"]);
        assert_eq!(report.code, Some(3));
        assert!(!report.success);
    }

    #[tokio::test]
    async fn terminate_sends_sigterm() {
        let script = write_temp_script("exec sleep 30\n");
        let spawner = CommandSpawner::new(script.to_str().expect("path"));

        let mut process = spawner.spawn(&[]).await.expect("spawn");
        process.control.terminate().expect("terminate");
        let report = tokio::time::timeout(Duration::from_secs(5), process.control.wait())
            .await
            .expect("process should exit after SIGTERM")
            .expect("wait");

        assert_eq!(report.code, None);
        assert_eq!(report.to_string(), "terminated by signal");
    }

    #[tokio::test]
    async fn overlong_lines_are_split() {
        let mut input = vec![b'x'; 10];
        input.extend_from_slice(b"\nok\n");
        let (tx, mut rx) = mpsc::channel(16);

        forward_lines(input.as_slice(), tx, 4).await;

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(chunks, ["xxxx", "xxxx", "xx\n", "ok\n"]);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let spawner = CommandSpawner::new("/nonexistent/fuzzdeck-engine");
        let err = spawner.spawn(&[]).await.err().expect("spawn should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
