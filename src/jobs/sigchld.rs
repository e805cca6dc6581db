//! Signal strategy: reap from a SIGCHLD action.
//!
//! The action runs at arbitrary instruction boundaries, so it sticks to an
//! atomic load, one `waitpid(-1, WNOHANG)`, and one `write(2)` of a report
//! rendered on the stack. While a foreground child is being waited on the
//! action does nothing, leaving that child to the blocking wait. The
//! foreground path raises SIGCHLD afterwards to pick up anything that ended
//! in the meantime.

use super::{render_report, Job, Reaper};
use crate::error::ShellError;
use crate::signal::safe_write::STDOUT;
use nix::sys::wait::{waitpid, WaitPidFlag};
use nix::unistd::Pid;
use signal_hook::consts::SIGCHLD;
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct SignalReaper {
    foreground_active: Arc<AtomicBool>,
    action: SigId,
}

impl SignalReaper {
    /// Register the SIGCHLD action. Only one should exist per process.
    pub fn install() -> Result<Self, ShellError> {
        let foreground_active = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&foreground_active);
        // SAFETY: reap_one is async-signal-safe (see module docs).
        let action = unsafe { signal_hook::low_level::register(SIGCHLD, move || reap_one(&flag)) }
            .map_err(|source| ShellError::SignalSetup {
                signal: "SIGCHLD",
                source,
            })?;
        Ok(Self {
            foreground_active,
            action,
        })
    }
}

fn reap_one(foreground_active: &AtomicBool) {
    if foreground_active.load(Ordering::SeqCst) {
        return;
    }
    if let Ok(status) = waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
        if let Some(job) = Job::from_wait_status(status) {
            render_report(&job).write_to(STDOUT);
        }
    }
}

impl Reaper for SignalReaper {
    fn track(&mut self, pid: Pid) {
        debug!(%pid, "background job left to SIGCHLD");
    }

    fn collect(&mut self) -> Vec<Job> {
        Vec::new()
    }

    fn begin_foreground(&mut self) {
        self.foreground_active.store(true, Ordering::SeqCst);
    }

    fn end_foreground(&mut self) -> Result<(), ShellError> {
        self.foreground_active.store(false, Ordering::SeqCst);
        signal_hook::low_level::raise(SIGCHLD).map_err(ShellError::Io)
    }
}

impl Drop for SignalReaper {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.action);
    }
}
