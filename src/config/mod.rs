//! Shell configuration
//!
//! Settings come from the environment first, then command-line flags:
//! - SMALLSH_REAPER (poll, signal) / `--reaper`
//! - SMALLSH_JOB_SLOTS (background table capacity) / `--job-slots`
//! - SMALLSH_PROMPT / `--prompt`
//! - SMALLSH_LOG (tracing filter directive)

use crate::error::ShellError;
use crate::jobs::table::DEFAULT_CAPACITY;
use crate::jobs::ReaperStrategy;
use std::env;

pub const DEFAULT_PROMPT: &str = ": ";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub reaper: ReaperStrategy,
    pub job_slots: usize,
    pub prompt: String,
    pub log_filter: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            reaper: ReaperStrategy::default(),
            job_slots: DEFAULT_CAPACITY,
            prompt: DEFAULT_PROMPT.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// What the command line asked the binary to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliAction {
    Run,
    Help,
    Version,
}

impl ShellConfig {
    pub fn from_env() -> Result<Self, ShellError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ShellError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("SMALLSH_REAPER") {
            config.reaper = parse_reaper(&value)?;
        }
        if let Some(value) = lookup("SMALLSH_JOB_SLOTS") {
            config.job_slots = parse_job_slots(&value)?;
        }
        if let Some(value) = lookup("SMALLSH_PROMPT") {
            config.prompt = value;
        }
        if let Some(value) = lookup("SMALLSH_LOG") {
            config.log_filter = value;
        }
        Ok(config)
    }

    /// Apply command-line flags on top of the current settings.
    pub fn apply_args(&mut self, args: &[String]) -> Result<CliAction, ShellError> {
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => return Ok(CliAction::Help),
                "-V" | "--version" => return Ok(CliAction::Version),
                flag @ ("--reaper" | "--job-slots" | "--prompt") => {
                    let value = args
                        .get(i + 1)
                        .ok_or_else(|| ShellError::Config(format!("{} requires a value", flag)))?;
                    match flag {
                        "--reaper" => self.reaper = parse_reaper(value)?,
                        "--job-slots" => self.job_slots = parse_job_slots(value)?,
                        _ => self.prompt = value.clone(),
                    }
                    i += 2;
                }
                other => {
                    return Err(ShellError::Config(format!("unknown argument '{}'", other)));
                }
            }
        }
        Ok(CliAction::Run)
    }
}

fn parse_reaper(value: &str) -> Result<ReaperStrategy, ShellError> {
    ReaperStrategy::from_str(value).ok_or_else(|| {
        ShellError::Config(format!(
            "unknown reaper strategy '{}' (expected poll or signal)",
            value
        ))
    })
}

fn parse_job_slots(value: &str) -> Result<usize, ShellError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ShellError::Config(format!(
            "job slots must be a positive integer, got '{}'",
            value
        ))),
    }
}
