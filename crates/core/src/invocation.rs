//! Mapping a canonical [`JobConfig`] to the engine's argument vector.
//!
//! The argument vector is handed to the OS as separate tokens; nothing here
//! is ever interpreted by a shell. [`Invocation::display`] exists only for
//! logs and the command preview.

use serde::Serialize;

use crate::config::JobConfig;

/// Flag that switches the engine to one JSON object per result line.
pub const MACHINE_OUTPUT_FLAG: &str = "-json";

/// Ordered, immutable argument tokens for one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    args: Vec<String>,
}

impl Invocation {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Arguments actually passed to the engine: the built tokens followed by
    /// the machine-readable output flag the runner depends on.
    pub fn process_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(MACHINE_OUTPUT_FLAG.to_string());
        args
    }

    /// Human-readable command line, POSIX-quoted where needed.
    pub fn display(&self, program: &str) -> String {
        std::iter::once(program)
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build the argument vector for `config`.
///
/// Token order is fixed, and any empty or disabled field is omitted entirely,
/// so the same config always yields byte-identical output.
pub fn build_invocation(config: &JobConfig) -> Invocation {
    let mut args = Vec::new();
    let mut push = |flag: &str, value: String| {
        args.push(flag.to_string());
        args.push(value);
    };

    push("-u", config.url.clone());

    for wl in &config.wordlists {
        let value = if wl.has_default_keyword() {
            wl.path.clone()
        } else {
            format!("{}:{}", wl.path, wl.keyword)
        };
        push("-w", value);
    }

    if config.method != crate::config::DEFAULT_METHOD {
        push("-X", config.method.clone());
    }
    if let Some(body) = &config.body {
        push("-d", body.clone());
    }
    for header in &config.headers {
        push("-H", header.clone());
    }

    for (kind, value) in &config.matchers {
        push(&format!("-m{}", kind.flag_suffix()), value.clone());
    }
    for (kind, value) in &config.filters {
        push(&format!("-f{}", kind.flag_suffix()), value.clone());
    }

    push("-t", config.concurrency.to_string());
    push("-timeout", config.timeout_secs.to_string());

    if config.recursion.enabled {
        args.push("-recursion".to_string());
        if let Some(depth) = config.recursion.max_depth {
            args.push("-recursion-depth".to_string());
            args.push(depth.to_string());
        }
    }

    let mut flag = |enabled: bool, name: &str| {
        if enabled {
            args.push(name.to_string());
        }
    };
    flag(config.follow_redirects, "-r");
    flag(config.ignore_body, "-ignore-body");

    if let Some(file) = &config.output.file {
        args.push("-o".to_string());
        args.push(file.clone());
    }
    if let Some(format) = config.output.format {
        args.push("-of".to_string());
        args.push(format.as_str().to_string());
    }

    let mut flag = |enabled: bool, name: &str| {
        if enabled {
            args.push(name.to_string());
        }
    };
    flag(config.display.silent, "-s");
    flag(config.display.verbose, "-v");
    flag(config.display.color, "-c");

    Invocation { args }
}

/// Quote a token the way `shlex.quote`-style tools do: bare when it only
/// contains safe characters, otherwise single-quoted.
fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r#"'"'"'"#))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
