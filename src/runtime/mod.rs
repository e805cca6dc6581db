use crate::jobs::Disposition;
use crate::parser::Parser;
use crate::signal::ForegroundOnly;
use nix::unistd::{getpid, Pid};

/// Interpreter state that outlives a single line.
///
/// The main loop records the last foreground disposition here. The
/// foreground-only flag is shared with its SIGTSTP action and is never
/// written from this side.
#[derive(Debug, Clone)]
pub struct Runtime {
    shell_pid: Pid,
    last_status: Disposition,
    foreground_only: ForegroundOnly,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(ForegroundOnly::new())
    }
}

impl Runtime {
    pub fn new(foreground_only: ForegroundOnly) -> Self {
        Self {
            shell_pid: getpid(),
            last_status: Disposition::default(),
            foreground_only,
        }
    }

    pub fn shell_pid(&self) -> Pid {
        self.shell_pid
    }

    /// Disposition of the last foreground command, `exit value 0` initially.
    pub fn last_status(&self) -> Disposition {
        self.last_status
    }

    pub fn set_last_status(&mut self, status: Disposition) {
        self.last_status = status;
    }

    pub fn foreground_only(&self) -> &ForegroundOnly {
        &self.foreground_only
    }

    /// A parser bound to this shell's PID and the current foreground-only mode.
    pub fn parser(&self) -> Parser {
        Parser::new(
            self.shell_pid.as_raw() as u32,
            self.foreground_only.is_enabled(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Statement;

    #[test]
    fn test_initial_status() {
        let runtime = Runtime::default();
        assert_eq!(runtime.last_status(), Disposition::Exited(0));
        assert_eq!(runtime.shell_pid(), getpid());
    }

    #[test]
    fn test_set_last_status() {
        let mut runtime = Runtime::default();
        runtime.set_last_status(Disposition::Signaled(2));
        assert_eq!(runtime.last_status(), Disposition::Signaled(2));
    }

    #[test]
    fn test_parser_follows_foreground_only() {
        let mode = ForegroundOnly::new();
        let runtime = Runtime::new(mode.clone());

        let background = |runtime: &Runtime| match runtime.parser().parse("sleep 1 &").unwrap() {
            Statement::Command(cmd) => cmd.background,
            other => panic!("unexpected {:?}", other),
        };

        assert!(background(&runtime));
        mode.toggle();
        assert!(!background(&runtime));
        mode.toggle();
        assert!(background(&runtime));
    }

    #[test]
    fn test_parser_expands_own_pid() {
        let runtime = Runtime::default();
        let expected = getpid().to_string();
        match runtime.parser().parse("echo $$").unwrap() {
            Statement::Command(cmd) => assert_eq!(cmd.argv[1], expected),
            other => panic!("unexpected {:?}", other),
        }
    }
}
