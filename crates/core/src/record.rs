//! Parsed engine results and classification of raw output lines.
//!
//! In `-json` mode the engine prints one JSON object per matched request on
//! stdout and free-text diagnostics elsewhere. [`classify_line`] turns any
//! line into either a [`ResultRecord`] or a log line; it never drops a
//! non-blank line.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One matched request reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub position: i64,
    pub status_code: i64,
    pub content_length: i64,
    pub word_count: i64,
    pub line_count: i64,
    /// Keyword → substituted value, in the order the engine reported them.
    pub input_values: IndexMap<String, String>,
    pub content_type: String,
    pub redirect_location: Option<String>,
    pub source_url: String,
}

/// Shape of a result line as the engine writes it.
#[derive(Debug, Deserialize)]
struct EngineResultLine {
    #[serde(default)]
    input: IndexMap<String, String>,
    #[serde(default)]
    position: i64,
    status: i64,
    #[serde(default)]
    length: i64,
    #[serde(default)]
    words: i64,
    #[serde(default)]
    lines: i64,
    #[serde(default, rename = "content-type", alias = "content_type")]
    content_type: String,
    #[serde(default)]
    redirectlocation: String,
    url: String,
}

impl From<EngineResultLine> for ResultRecord {
    fn from(line: EngineResultLine) -> Self {
        Self {
            position: line.position,
            status_code: line.status,
            content_length: line.length,
            word_count: line.words,
            line_count: line.lines,
            input_values: line.input,
            content_type: line.content_type,
            redirect_location: Some(line.redirectlocation).filter(|r| !r.is_empty()),
            source_url: line.url,
        }
    }
}

/// Why a line could not be read as a result record.
#[derive(Debug, thiserror::Error)]
pub enum StreamParseError {
    #[error("line is not JSON")]
    NotJson,

    #[error("JSON line is not a result object")]
    NotAResult,

    #[error("malformed result object: {0}")]
    Schema(String),
}

/// Classification of one line of engine output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    Result(ResultRecord),
    Log(String),
    Blank,
}

/// Parse a line that is expected to carry a result object.
///
/// A line counts as a result candidate when it is a JSON object with both
/// `url` and `status` keys.
pub fn parse_result_line(line: &str) -> Result<ResultRecord, StreamParseError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|_| StreamParseError::NotJson)?;
    let is_candidate = value
        .as_object()
        .is_some_and(|obj| obj.contains_key("url") && obj.contains_key("status"));
    if !is_candidate {
        return Err(StreamParseError::NotAResult);
    }
    serde_json::from_value::<EngineResultLine>(value)
        .map(ResultRecord::from)
        .map_err(|e| StreamParseError::Schema(e.to_string()))
}

/// Classify a raw output line. Surrounding whitespace is trimmed.
pub fn classify_line(raw: &str) -> OutputLine {
    let line = raw.trim();
    if line.is_empty() {
        return OutputLine::Blank;
    }
    match parse_result_line(line) {
        Ok(record) => OutputLine::Result(record),
        Err(StreamParseError::Schema(reason)) => {
            tracing::debug!(%reason, "Result-shaped line failed to parse, forwarding as log");
            OutputLine::Log(line.to_string())
        }
        Err(_) => OutputLine::Log(line.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
