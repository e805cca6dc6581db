//! Signal dispositions for the interactive shell.
//!
//! The shell ignores SIGINT so the interrupt key only ever reaches a
//! foreground child. SIGTSTP does not stop the shell; it flips
//! foreground-only mode, in which a trailing `&` is dropped.

pub mod safe_write;

use crate::error::ShellError;
use libc::c_int;
use nix::sys::signal::{self, SigHandler, Signal};
use signal_hook::consts::SIGTSTP;
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{io, mem, ptr};

pub const ENTER_FOREGROUND_ONLY: &[u8] = b"\nEntering foreground-only mode (& is now ignored)\n";
pub const EXIT_FOREGROUND_ONLY: &[u8] = b"\nExiting foreground-only mode\n";

/// Foreground-only mode flag.
///
/// Only the SIGTSTP action writes it. The parser and executor read it
/// synchronously; a single atomic word needs no further coordination.
#[derive(Clone, Debug, Default)]
pub struct ForegroundOnly {
    flag: Arc<AtomicBool>,
}

impl ForegroundOnly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Flip the mode and announce the new state on stdout.
    ///
    /// Async-signal-safe: one atomic RMW plus `write(2)` of a static message.
    /// Returns the new state.
    pub fn toggle(&self) -> bool {
        let was_enabled = self.flag.fetch_xor(true, Ordering::SeqCst);
        let message = if was_enabled {
            EXIT_FOREGROUND_ONLY
        } else {
            ENTER_FOREGROUND_ONLY
        };
        safe_write::write_all(safe_write::STDOUT, message);
        !was_enabled
    }

    /// Route SIGTSTP to [`toggle`](Self::toggle).
    ///
    /// The action interrupts a blocked read, so the prompt loop sees
    /// `ErrorKind::Interrupted` and prints a fresh prompt.
    pub fn install(&self) -> Result<SigId, ShellError> {
        let mode = self.clone();
        // SAFETY: the action only touches an atomic and calls write(2).
        let id = unsafe {
            signal_hook::low_level::register(SIGTSTP, move || {
                mode.toggle();
            })
        }
        .map_err(|source| ShellError::SignalSetup {
            signal: "SIGTSTP",
            source,
        })?;
        disable_restart(SIGTSTP).map_err(|source| ShellError::SignalSetup {
            signal: "SIGTSTP",
            source,
        })?;
        Ok(id)
    }
}

/// Clear `SA_RESTART` on the action currently installed for `signal`.
///
/// signal-hook always registers with `SA_RESTART`; the handler itself is
/// left in place.
fn disable_restart(signal: c_int) -> io::Result<()> {
    // SAFETY: both calls get valid pointers; the second reinstalls the
    // handler, mask and flags just read, minus one flag bit.
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        if libc::sigaction(signal, ptr::null(), &mut action) != 0 {
            return Err(io::Error::last_os_error());
        }
        action.sa_flags &= !libc::SA_RESTART;
        if libc::sigaction(signal, &action, ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Make the shell immune to the interrupt key.
pub fn ignore_interrupts() -> Result<(), ShellError> {
    // SAFETY: SigIgn installs no Rust code.
    unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) }
        .map(drop)
        .map_err(|errno| ShellError::SignalSetup {
            signal: "SIGINT",
            source: errno.into(),
        })
}

/// Dispositions for a freshly forked child, applied just before exec.
///
/// Every child ignores SIGTSTP. A foreground child gets the default SIGINT
/// back; a background child keeps the ignored disposition it inherited.
pub(crate) fn prepare_child(background: bool) {
    // SAFETY: sigaction with SigIgn/SigDfl is async-signal-safe and installs
    // no Rust code.
    unsafe {
        let _ = signal::signal(Signal::SIGTSTP, SigHandler::SigIgn);
        if !background {
            let _ = signal::signal(Signal::SIGINT, SigHandler::SigDfl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_foreground_only_starts_disabled() {
        let mode = ForegroundOnly::new();
        assert!(!mode.is_enabled());
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mode = ForegroundOnly::new();
        assert!(mode.toggle());
        assert!(mode.is_enabled());
        assert!(!mode.toggle());
        assert!(!mode.is_enabled());
    }

    #[test]
    fn test_clones_share_state() {
        let mode = ForegroundOnly::new();
        let reader = mode.clone();
        mode.toggle();
        assert!(reader.is_enabled());
    }

    #[test]
    fn test_messages() {
        assert_eq!(ENTER_FOREGROUND_ONLY.len(), 50);
        assert_eq!(EXIT_FOREGROUND_ONLY.len(), 30);
    }

    #[test]
    fn test_sigtstp_toggles_installed_mode() {
        let mode = ForegroundOnly::new();
        let id = mode.install().unwrap();

        signal_hook::low_level::raise(SIGTSTP).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(mode.is_enabled());

        signal_hook::low_level::raise(SIGTSTP).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!mode.is_enabled());

        assert!(signal_hook::low_level::unregister(id));
    }

    #[test]
    fn test_installed_action_interrupts_syscalls() {
        let mode = ForegroundOnly::new();
        let id = mode.install().unwrap();

        let flags = unsafe {
            let mut action: libc::sigaction = mem::zeroed();
            assert_eq!(libc::sigaction(SIGTSTP, ptr::null(), &mut action), 0);
            action.sa_flags
        };
        assert_eq!(flags & libc::SA_RESTART, 0);

        signal_hook::low_level::unregister(id);
    }
}
