//! Job configuration schema and normalization.
//!
//! [`RawJobConfig`] mirrors the loosely-typed JSON the browser form posts:
//! numeric fields may arrive as numbers, numeric strings or empty strings.
//! [`normalize`] validates it once and produces a canonical [`JobConfig`]
//! with every default applied. Nothing downstream re-validates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Placeholder token substituted by a wordlist when no keyword is given.
pub const DEFAULT_KEYWORD: &str = "FUZZ";

/// HTTP method used when the form leaves it blank.
pub const DEFAULT_METHOD: &str = "GET";

/// Number of concurrent engine workers (`-t`).
pub const DEFAULT_CONCURRENCY: u32 = 40;

/// Per-request timeout in seconds (`-timeout`).
pub const DEFAULT_TIMEOUT_SECS: u32 = 10;

// ---------------------------------------------------------------------------
// Raw (wire) config
// ---------------------------------------------------------------------------

/// One wordlist row as submitted by the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawWordlist {
    pub path: String,
    pub keyword: Option<String>,
}

/// Scan configuration exactly as posted by the client.
///
/// Field names follow the engine's short flags so the form can post them
/// as-is (`mc` = match codes, `fs` = filter size, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawJobConfig {
    pub url: String,
    pub method: Option<String>,
    pub data: Option<String>,
    pub headers: Vec<String>,
    pub wordlists: Vec<RawWordlist>,

    pub mc: Option<String>,
    pub ms: Option<String>,
    pub mw: Option<String>,
    pub ml: Option<String>,
    pub mr: Option<String>,

    pub fc: Option<String>,
    pub fs: Option<String>,
    pub fw: Option<String>,
    pub fl: Option<String>,
    pub fr: Option<String>,

    pub threads: Option<Value>,
    pub timeout: Option<Value>,
    pub recursion: bool,
    pub recursion_depth: Option<Value>,
    pub follow_redirects: bool,
    pub ignore_body: bool,

    pub output_file: Option<String>,
    pub output_format: Option<String>,

    pub silent: bool,
    pub verbose: bool,
    pub colors: bool,
}

// ---------------------------------------------------------------------------
// Canonical config
// ---------------------------------------------------------------------------

/// A wordlist file bound to the placeholder keyword it substitutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordlistBinding {
    pub path: String,
    pub keyword: String,
}

impl WordlistBinding {
    /// `true` when the binding uses the reserved placeholder.
    pub fn has_default_keyword(&self) -> bool {
        self.keyword == DEFAULT_KEYWORD
    }
}

/// Response property a matcher or filter inspects.
///
/// Declaration order is the order predicates appear on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    StatusCode,
    Size,
    WordCount,
    LineCount,
    Regex,
}

impl PredicateKind {
    pub const ALL: [PredicateKind; 5] = [
        PredicateKind::StatusCode,
        PredicateKind::Size,
        PredicateKind::WordCount,
        PredicateKind::LineCount,
        PredicateKind::Regex,
    ];

    /// Second letter of the engine flag (`-mc`, `-fs`, ...).
    pub fn flag_suffix(self) -> char {
        match self {
            Self::StatusCode => 'c',
            Self::Size => 's',
            Self::WordCount => 'w',
            Self::LineCount => 'l',
            Self::Regex => 'r',
        }
    }
}

/// Sparse set of predicates keyed by kind; iteration follows kind order.
pub type PredicateSet = BTreeMap<PredicateKind, String>;

/// File formats the engine can write its own report in (`-of`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Ejson,
    Html,
    Md,
    Csv,
    Ecsv,
    All,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ejson => "ejson",
            Self::Html => "html",
            Self::Md => "md",
            Self::Csv => "csv",
            Self::Ecsv => "ecsv",
            Self::All => "all",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "ejson" => Some(Self::Ejson),
            "html" => Some(Self::Html),
            "md" => Some(Self::Md),
            "csv" => Some(Self::Csv),
            "ecsv" => Some(Self::Ecsv),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recursion {
    pub enabled: bool,
    /// `None` means the engine's own default depth.
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSink {
    pub file: Option<String>,
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFlags {
    pub silent: bool,
    pub verbose: bool,
    pub color: bool,
}

/// Validated, canonical scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
    pub headers: Vec<String>,
    pub wordlists: Vec<WordlistBinding>,
    pub matchers: PredicateSet,
    pub filters: PredicateSet,
    pub concurrency: u32,
    pub timeout_secs: u32,
    pub recursion: Recursion,
    pub follow_redirects: bool,
    pub ignore_body: bool,
    pub output: OutputSink,
    pub display: DisplayFlags,
}

impl JobConfig {
    /// Minimal valid config: one URL, one wordlist, everything else default.
    pub fn new(url: impl Into<String>, wordlist: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            body: None,
            headers: Vec::new(),
            wordlists: vec![WordlistBinding {
                path: wordlist.into(),
                keyword: DEFAULT_KEYWORD.to_string(),
            }],
            matchers: PredicateSet::new(),
            filters: PredicateSet::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            recursion: Recursion::default(),
            follow_redirects: false,
            ignore_body: false,
            output: OutputSink::default(),
            display: DisplayFlags::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Validate a raw config and apply defaults.
///
/// Fails with [`CoreError::Validation`] when the URL is blank, when no
/// wordlist has a path, or when a numeric field is not a positive integer.
pub fn normalize(raw: &RawJobConfig) -> Result<JobConfig, CoreError> {
    let url = raw.url.trim();
    if url.is_empty() {
        return Err(CoreError::Validation("URL is required".to_string()));
    }

    let wordlists: Vec<WordlistBinding> = raw
        .wordlists
        .iter()
        .filter_map(|wl| {
            let path = wl.path.trim();
            if path.is_empty() {
                return None;
            }
            let keyword = wl
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .unwrap_or(DEFAULT_KEYWORD);
            Some(WordlistBinding {
                path: path.to_string(),
                keyword: keyword.to_string(),
            })
        })
        .collect();
    if wordlists.is_empty() {
        return Err(CoreError::Validation(
            "At least one wordlist is required".to_string(),
        ));
    }

    let method = match non_empty(raw.method.as_deref()) {
        Some(m) => {
            if !m.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(CoreError::Validation(format!(
                    "HTTP method must be alphabetic, got '{m}'"
                )));
            }
            m.to_ascii_uppercase()
        }
        None => DEFAULT_METHOD.to_string(),
    };

    let headers = raw
        .headers
        .iter()
        .filter(|h| !h.trim().is_empty())
        .cloned()
        .collect();

    let matchers = predicate_set([&raw.mc, &raw.ms, &raw.mw, &raw.ml, &raw.mr]);
    let filters = predicate_set([&raw.fc, &raw.fs, &raw.fw, &raw.fl, &raw.fr]);

    let concurrency = positive_or_default(raw.threads.as_ref(), "threads", DEFAULT_CONCURRENCY)?;
    let timeout_secs = positive_or_default(raw.timeout.as_ref(), "timeout", DEFAULT_TIMEOUT_SECS)?;

    let recursion = if raw.recursion {
        let depth = parse_integer(raw.recursion_depth.as_ref(), "recursion_depth")?;
        Recursion {
            enabled: true,
            max_depth: depth.filter(|d| *d != 0),
        }
    } else {
        Recursion::default()
    };

    let format = match non_empty(raw.output_format.as_deref()) {
        Some(f) => Some(OutputFormat::parse(f).ok_or_else(|| {
            CoreError::Validation(format!("Unsupported output format '{f}'"))
        })?),
        None => None,
    };

    Ok(JobConfig {
        url: url.to_string(),
        method,
        body: verbatim(raw.data.as_deref()).map(str::to_string),
        headers,
        wordlists,
        matchers,
        filters,
        concurrency,
        timeout_secs,
        recursion,
        follow_redirects: raw.follow_redirects,
        ignore_body: raw.ignore_body,
        output: OutputSink {
            file: non_empty(raw.output_file.as_deref()).map(str::to_string),
            format,
        },
        display: DisplayFlags {
            silent: raw.silent,
            verbose: raw.verbose,
            color: raw.colors,
        },
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Like [`non_empty`] but keeps surrounding whitespace of the value.
fn verbatim(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn predicate_set(values: [&Option<String>; 5]) -> PredicateSet {
    PredicateKind::ALL
        .into_iter()
        .zip(values)
        .filter_map(|(kind, value)| verbatim(value.as_deref()).map(|v| (kind, v.to_string())))
        .collect()
}

/// Parse a lenient non-negative integer field. Null and blank mean unset.
fn parse_integer(value: Option<&Value>, name: &str) -> Result<Option<u32>, CoreError> {
    let invalid = || CoreError::Validation(format!("{name} must be a non-negative integer"));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u32>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn positive_or_default(value: Option<&Value>, name: &str, default: u32) -> Result<u32, CoreError> {
    match parse_integer(value, name) {
        Ok(Some(0)) | Err(_) => Err(CoreError::Validation(format!(
            "{name} must be a positive integer"
        ))),
        Ok(Some(n)) => Ok(n),
        Ok(None) => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
