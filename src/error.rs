//! Interpreter-level errors for smallsh
//!
//! User command failures (a missing program, an unreadable redirect target)
//! are not represented here: they are reported in the command's
//! `ExecutionResult` and recorded as its disposition. `ShellError` covers
//! everything that concerns the interpreter itself.

use serde::Serialize;
use std::io;

/// Maximum number of argument strings accepted on one command line.
pub const MAX_ARGS: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// No child process could be created. The interpreter cannot continue.
    #[error("fork failed: {0}")]
    Fork(#[source] nix::errno::Errno),

    #[error("waiting for pid {pid} failed: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("cannot install {signal} handler: {source}")]
    SignalSetup {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("argument contains a NUL byte: {0:?}")]
    InvalidArgument(String),

    #[error("too many arguments (max {limit})")]
    TooManyArguments { limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Serialize)]
struct JsonError<'a> {
    error_code: &'a str,
    message: String,
    exit_code: i32,
}

impl ShellError {
    /// Stable identifier for the error category.
    pub fn error_code(&self) -> &'static str {
        match self {
            ShellError::Fork(_) => "FORK_FAILED",
            ShellError::Wait { .. } => "WAIT_FAILED",
            ShellError::SignalSetup { .. } => "SIGNAL_SETUP",
            ShellError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ShellError::TooManyArguments { .. } => "TOO_MANY_ARGUMENTS",
            ShellError::Config(_) => "CONFIG",
            ShellError::Io(_) => "IO",
        }
    }

    /// Exit status the interpreter uses when this error ends it.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Whether the interpreter must terminate after reporting this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fork(_) | ShellError::SignalSetup { .. })
    }

    /// Format error as JSON string
    pub fn to_json(&self) -> String {
        let body = JsonError {
            error_code: self.error_code(),
            message: self.to_string(),
            exit_code: self.exit_code(),
        };
        serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(
                r#"{{"error_code":"{}","exit_code":{}}}"#,
                body.error_code, body.exit_code
            )
        })
    }

    /// Format error as human-readable text
    pub fn to_text(&self) -> String {
        format!("smallsh: {}", self)
    }
}

/// Check if errors should be output in JSON format
///
/// Returns true when SMALLSH_ERROR_FORMAT is set to "json".
pub fn should_output_json_errors() -> bool {
    std::env::var("SMALLSH_ERROR_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Render an error the way the user asked for it.
pub fn render(err: &ShellError) -> String {
    if should_output_json_errors() {
        err.to_json()
    } else {
        err.to_text()
    }
}
