//! Units of the live event feed.
//!
//! Wire form is `{"type": "result" | "log" | "status" | "error", "data": ...}`,
//! one JSON message per event.

use serde::{Deserialize, Serialize};

use crate::record::{classify_line, OutputLine, ResultRecord};

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    /// The engine exited on its own.
    Finished,
    /// The operator asked the job to stop.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    Result(ResultRecord),
    #[serde(rename = "log")]
    LogLine(String),
    Status(TerminalStatus),
    Error(String),
}

impl StreamEvent {
    /// Convert a raw engine output line. Blank lines produce nothing.
    pub fn from_output_line(line: &str) -> Option<Self> {
        match classify_line(line) {
            OutputLine::Result(record) => Some(Self::Result(record)),
            OutputLine::Log(text) => Some(Self::LogLine(text)),
            OutputLine::Blank => None,
        }
    }

    /// A terminal event ends every subscription after it is delivered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Status(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Result(_) => "result",
            Self::LogLine(_) => "log",
            Self::Status(_) => "status",
            Self::Error(_) => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
