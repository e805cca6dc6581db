//! Background job tracking.
//!
//! Two strategies discover when background children terminate, both behind
//! the [`Reaper`] trait:
//!
//! - [`PollingReaper`] keeps a fixed table of background PIDs and probes
//!   each one with a non-blocking `waitpid` before every prompt.
//! - [`SignalReaper`] reaps from a SIGCHLD action and writes the report
//!   itself, using only async-signal-safe calls.
//!
//! Whichever is used, each background termination is reported once, as
//! `background pid <pid> is done: <disposition>`.

pub mod sigchld;
pub mod table;

pub use sigchld::SignalReaper;
pub use table::{JobTable, PollingReaper};

use crate::error::ShellError;
use crate::signal::safe_write::StackBuf;
use nix::errno::Errno;
use nix::sys::wait::{wait, WaitStatus};
use nix::unistd::Pid;
use std::fmt;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Exited(i32),
    Signaled(i32),
}

impl Disposition {
    /// Terminal disposition carried by `status`, if it reports a termination.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Disposition::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Disposition::Signaled(signal as i32)),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match *self {
            Disposition::Exited(code) | Disposition::Signaled(code) => code,
        }
    }

    pub fn is_signaled(&self) -> bool {
        matches!(self, Disposition::Signaled(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Disposition::Exited(_) => "exit value ",
            Disposition::Signaled(_) => "terminated by signal ",
        }
    }
}

impl Default for Disposition {
    fn default() -> Self {
        Disposition::Exited(0)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.label(), self.code())
    }
}

/// A reaped background child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub disposition: Disposition,
}

impl Job {
    pub fn new(pid: Pid, disposition: Disposition) -> Self {
        Self { pid, disposition }
    }

    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        let pid = status.pid()?;
        Disposition::from_wait_status(status).map(|d| Job::new(pid, d))
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background pid {} is done: {}", self.pid, self.disposition)
    }
}

/// Capacity of a rendered report line.
const REPORT_CAPACITY: usize = 96;

/// Render `job`'s report line, newline included, without allocating.
///
/// Produces the same text as the `Display` impl.
pub fn render_report(job: &Job) -> StackBuf<REPORT_CAPACITY> {
    let mut buf = StackBuf::new();
    buf.push_bytes(b"background pid ")
        .push_decimal(job.pid.as_raw() as i64)
        .push_bytes(b" is done: ")
        .push_bytes(job.disposition.label().as_bytes())
        .push_decimal(job.disposition.code() as i64)
        .push_bytes(b"\n");
    buf
}

/// Which reaping strategy a shell runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaperStrategy {
    #[default]
    Poll,
    Signal,
}

impl ReaperStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "poll" | "polling" => Some(ReaperStrategy::Poll),
            "signal" | "sigchld" => Some(ReaperStrategy::Signal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReaperStrategy::Poll => "poll",
            ReaperStrategy::Signal => "signal",
        }
    }
}

/// Discovers background terminations without blocking the prompt loop.
pub trait Reaper {
    /// Start tracking a background child.
    fn track(&mut self, pid: Pid);

    /// Jobs that finished since the last call. Run before each prompt.
    fn collect(&mut self) -> Vec<Job>;

    /// A foreground child is about to be forked and waited on.
    fn begin_foreground(&mut self) {}

    /// The foreground wait is over.
    fn end_foreground(&mut self) -> Result<(), ShellError> {
        Ok(())
    }
}

/// Block until every remaining child has been reaped.
pub fn wait_all() {
    loop {
        match wait() {
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
}
