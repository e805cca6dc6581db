//! fork/exec of one external command and the blocking foreground wait.

use super::redirect::Redirections;
use crate::error::ShellError;
use crate::jobs::Disposition;
use crate::signal::{self, safe_write};
use libc::c_char;
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::{fork, ForkResult, Pid};
use std::ffi::CString;
use std::ptr;

/// Everything `execvp` needs, built before forking so the child never
/// allocates.
#[derive(Debug)]
pub struct ExecArgs {
    args: Vec<CString>,
    argv: Vec<*const c_char>,
    error_prefix: Vec<u8>,
}

impl ExecArgs {
    pub fn new(argv: &[String]) -> Result<Self, ShellError> {
        let program = argv
            .first()
            .ok_or_else(|| ShellError::InvalidArgument(String::new()))?;
        let args = argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_bytes()).map_err(|_| ShellError::InvalidArgument(arg.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        // The CStrings' heap buffers stay put when `args` moves into Self.
        let argv = args
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        Ok(Self {
            args,
            argv,
            error_prefix: format!("{}: ", program).into_bytes(),
        })
    }

    pub fn program(&self) -> &CString {
        &self.args[0]
    }
}

/// Fork a child that runs `exec` with `redirects` applied.
///
/// Returns the child's PID in the parent. The parent's copies of the
/// redirect targets are closed before returning.
pub fn fork_exec(
    exec: &ExecArgs,
    redirects: Redirections,
    background: bool,
) -> Result<Pid, ShellError> {
    // SAFETY: the child branch only makes async-signal-safe calls before
    // exec or _exit.
    match unsafe { fork() } {
        Err(errno) => Err(ShellError::Fork(errno)),
        Ok(ForkResult::Child) => exec_child(exec, &redirects, background),
        Ok(ForkResult::Parent { child }) => {
            drop(redirects);
            Ok(child)
        }
    }
}

fn exec_child(exec: &ExecArgs, redirects: &Redirections, background: bool) -> ! {
    if let Err(errno) = redirects.install() {
        child_fail(b"smallsh: redirect: ", errno);
    }
    signal::prepare_child(background);

    // SAFETY: argv is a NULL-terminated array of pointers into live CStrings.
    unsafe { libc::execvp(exec.program().as_ptr(), exec.argv.as_ptr()) };
    child_fail(&exec.error_prefix, Errno::last())
}

fn child_fail(prefix: &[u8], errno: Errno) -> ! {
    safe_write::write_all(safe_write::STDERR, prefix);
    safe_write::write_all(safe_write::STDERR, errno.desc().as_bytes());
    safe_write::write_all(safe_write::STDERR, b"\n");
    // SAFETY: _exit skips atexit handlers and stdio flushing, both of which
    // belong to the parent.
    unsafe { libc::_exit(1) }
}

/// Block until `pid` terminates and return how it ended.
pub fn wait_for(pid: Pid) -> Result<Disposition, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(disposition) = Disposition::from_wait_status(status) {
                    return Ok(disposition);
                }
            }
            Err(Errno::EINTR) => {}
            Err(source) => {
                return Err(ShellError::Wait {
                    pid: pid.as_raw(),
                    source,
                })
            }
        }
    }
}
