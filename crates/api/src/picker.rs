//! File path picker used by the browse endpoints.
//!
//! The server cannot open a native dialog itself, so [`CommandPicker`] runs
//! a configured external dialog command (for example
//! `zenity --file-selection`) and reads the chosen path from its stdout.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// How long a dialog may stay open before the request gives up.
pub const PICKER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("No file selected")]
    Cancelled,

    #[error("No file dialog command is configured")]
    Unavailable,

    #[error("File dialog timed out")]
    TimedOut,

    #[error("File dialog failed: {0}")]
    Io(#[from] io::Error),
}

/// Which kind of dialog to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMode {
    Open,
    Save,
}

#[async_trait]
pub trait PathPicker: Send + Sync {
    async fn pick(&self, mode: PickMode) -> Result<String, PickError>;
}

/// Runs one external command per dialog kind.
///
/// Commands are split on whitespace and executed directly, never through a
/// shell.
#[derive(Debug, Clone)]
pub struct CommandPicker {
    open_cmd: Option<Vec<String>>,
    save_cmd: Option<Vec<String>>,
    timeout: Duration,
}

impl CommandPicker {
    pub fn new(open_cmd: Option<&str>, save_cmd: Option<&str>) -> Self {
        Self {
            open_cmd: open_cmd.and_then(split_command),
            save_cmd: save_cmd.and_then(split_command),
            timeout: PICKER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn split_command(cmd: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
    (!parts.is_empty()).then_some(parts)
}

#[async_trait]
impl PathPicker for CommandPicker {
    async fn pick(&self, mode: PickMode) -> Result<String, PickError> {
        let argv = match mode {
            PickMode::Open => self.open_cmd.as_ref(),
            PickMode::Save => self.save_cmd.as_ref(),
        }
        .ok_or(PickError::Unavailable)?;

        let (program, args) = argv.split_first().ok_or(PickError::Unavailable)?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PickError::TimedOut)??;

        // Dialog tools exit non-zero when the user cancels.
        if !output.status.success() {
            tracing::debug!(?mode, status = ?output.status, "File dialog cancelled");
            return Err(PickError::Cancelled);
        }

        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path.is_empty() {
            return Err(PickError::Cancelled);
        }
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_picker_is_unavailable() {
        let picker = CommandPicker::new(None, Some("   "));
        assert!(matches!(
            picker.pick(PickMode::Open).await,
            Err(PickError::Unavailable)
        ));
        assert!(matches!(
            picker.pick(PickMode::Save).await,
            Err(PickError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn reads_trimmed_path_from_stdout() {
        let picker = CommandPicker::new(Some("echo /tmp/words.txt"), None);
        assert_eq!(picker.pick(PickMode::Open).await.unwrap(), "/tmp/words.txt");
    }

    #[tokio::test]
    async fn non_zero_exit_means_cancelled() {
        let picker = CommandPicker::new(None, Some("false"));
        assert!(matches!(
            picker.pick(PickMode::Save).await,
            Err(PickError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn slow_dialog_times_out() {
        let picker = CommandPicker::new(Some("sleep 5"), None)
            .with_timeout(Duration::from_millis(50));
        assert!(matches!(
            picker.pick(PickMode::Open).await,
            Err(PickError::TimedOut)
        ));
    }
}
