pub mod process;
pub mod redirect;

use crate::builtins;
use crate::error::ShellError;
use crate::jobs::{self, Disposition, Job, PollingReaper, Reaper};
use crate::parser::ast::*;
use crate::runtime::Runtime;
use process::ExecArgs;
use redirect::Redirections;
use tracing::debug;

/// What a line produced for the user, plus whether the shell should stop.
///
/// Output from children goes straight to the inherited descriptors; only the
/// shell's own messages end up here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_shell: bool,
}

impl ExecutionResult {
    pub fn exit() -> Self {
        Self {
            exit_shell: true,
            ..Default::default()
        }
    }

    pub fn with_stdout(mut self, text: impl Into<String>) -> Self {
        self.stdout = text.into();
        self
    }

    pub fn with_stderr(mut self, text: impl Into<String>) -> Self {
        self.stderr = text.into();
        self
    }
}

pub struct Executor {
    runtime: Runtime,
    reaper: Box<dyn Reaper>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// An executor with fresh state and the polling reaper.
    pub fn new() -> Self {
        Self::with_reaper(Runtime::default(), Box::new(PollingReaper::default()))
    }

    pub fn with_reaper(runtime: Runtime, reaper: Box<dyn Reaper>) -> Self {
        Self { runtime, reaper }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Parse and run one line, already stripped of trailing whitespace.
    pub fn execute_line(&mut self, line: &str) -> Result<ExecutionResult, ShellError> {
        let statement = self.runtime.parser().parse(line)?;
        self.execute(statement)
    }

    pub fn execute(&mut self, statement: Statement) -> Result<ExecutionResult, ShellError> {
        match statement {
            Statement::Empty => Ok(ExecutionResult::default()),
            Statement::Comment => Ok(ExecutionResult::default().with_stdout("\n")),
            Statement::Exit => Ok(builtins::builtin_exit()),
            Statement::Status => Ok(builtins::builtin_status(&self.runtime)),
            Statement::Cd(target) => Ok(builtins::builtin_cd(target.as_deref())),
            Statement::Command(command) => self.execute_external_command(&command),
        }
    }

    /// Background jobs that finished since the last call.
    pub fn reap_finished(&mut self) -> Vec<Job> {
        self.reaper.collect()
    }

    /// Wait for every remaining child. Used on `exit` and end of input.
    pub fn shutdown(&mut self) {
        // Keep a SIGCHLD action from racing the drain.
        self.reaper.begin_foreground();
        jobs::wait_all();
    }

    fn execute_external_command(&mut self, command: &Command) -> Result<ExecutionResult, ShellError> {
        // Mode may have flipped since the line was parsed.
        let background = command.background && !self.runtime.foreground_only().is_enabled();
        let exec = ExecArgs::new(&command.argv)?;

        let redirects = match Redirections::open(command, background) {
            Ok(redirects) => redirects,
            Err(e) => {
                self.runtime.set_last_status(Disposition::Exited(1));
                return Ok(ExecutionResult::default().with_stdout(format!("{}\n", e)));
            }
        };

        if background {
            let pid = process::fork_exec(&exec, redirects, true)?;
            debug!(%pid, argv = ?command.argv, "spawned background job");
            self.reaper.track(pid);
            return Ok(ExecutionResult::default().with_stdout(format!("background pid is: {}\n", pid)));
        }

        self.reaper.begin_foreground();
        let pid = match process::fork_exec(&exec, redirects, false) {
            Ok(pid) => pid,
            Err(e) => {
                let _ = self.reaper.end_foreground();
                return Err(e);
            }
        };
        debug!(%pid, argv = ?command.argv, "spawned foreground command");

        let waited = process::wait_for(pid);
        let ended = self.reaper.end_foreground();
        let disposition = waited?;
        debug!(%pid, %disposition, "foreground command finished");

        // The status is recorded even when the reaper hook failed.
        self.runtime.set_last_status(disposition);
        ended?;
        let mut result = ExecutionResult::default();
        if disposition.is_signaled() {
            result.stdout = format!("{}\n", disposition);
        }
        Ok(result)
    }
}
