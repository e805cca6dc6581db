//! Standard input/output wiring for a child.
//!
//! Targets are opened in the shell before forking, close-on-exec. The child
//! `dup2`s them onto descriptors 0 and 1; the shell's own copies close when
//! the [`Redirections`] value is dropped after the fork. The shell's standard
//! descriptors are never touched.

use crate::parser::ast::Command;
use nix::unistd::dup2;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use tracing::debug;

pub const NULL_DEVICE: &str = "/dev/null";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedirectError {
    #[error("cannot open {0} for input")]
    Input(String),
    #[error("cannot open {0} for output")]
    Output(String),
}

#[derive(Debug, Default)]
pub struct Redirections {
    stdin: Option<File>,
    stdout: Option<File>,
}

impl Redirections {
    /// Open what `command` asks for.
    ///
    /// A background command with no explicit target in a direction gets the
    /// null device, so it can neither read from nor write to the terminal.
    pub fn open(command: &Command, background: bool) -> Result<Self, RedirectError> {
        let input = command
            .input
            .as_deref()
            .or(background.then_some(NULL_DEVICE));
        let output = command
            .output
            .as_deref()
            .or(background.then_some(NULL_DEVICE));

        let stdin = input
            .map(|path| {
                File::open(path).map_err(|e| {
                    debug!(path, error = %e, "input redirect failed");
                    RedirectError::Input(path.to_string())
                })
            })
            .transpose()?;

        let stdout = output
            .map(|path| {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(0o644)
                    .open(path)
                    .map_err(|e| {
                        debug!(path, error = %e, "output redirect failed");
                        RedirectError::Output(path.to_string())
                    })
            })
            .transpose()?;

        Ok(Self { stdin, stdout })
    }

    pub fn redirects_stdin(&self) -> bool {
        self.stdin.is_some()
    }

    pub fn redirects_stdout(&self) -> bool {
        self.stdout.is_some()
    }

    /// Point descriptors 0 and 1 at the opened targets.
    ///
    /// Called in the forked child; `dup2` is async-signal-safe.
    pub(crate) fn install(&self) -> nix::Result<()> {
        if let Some(file) = &self.stdin {
            dup2(file.as_raw_fd(), libc::STDIN_FILENO)?;
        }
        if let Some(file) = &self.stdout {
            dup2(file.as_raw_fd(), libc::STDOUT_FILENO)?;
        }
        Ok(())
    }
}
