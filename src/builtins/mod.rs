//! The three commands the shell runs in its own process.

use crate::executor::ExecutionResult;
use crate::runtime::Runtime;
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// `cd [dir]`
///
/// Changes the shell's own working directory; without an argument, to
/// `$HOME`. A failed change leaves the directory as it was and reports on
/// stderr.
pub fn builtin_cd(target: Option<&str>) -> ExecutionResult {
    let dir = match target {
        Some(dir) => PathBuf::from(dir),
        None => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home),
            None => return ExecutionResult::default().with_stderr("smallsh: cd: HOME not set\n"),
        },
    };

    match env::set_current_dir(&dir) {
        Ok(()) => ExecutionResult::default(),
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "cd failed");
            ExecutionResult::default()
                .with_stderr(format!("smallsh: cd: {}: {}\n", dir.display(), e))
        }
    }
}

/// `status`: the last foreground command's disposition.
pub fn builtin_status(runtime: &Runtime) -> ExecutionResult {
    ExecutionResult::default().with_stdout(format!("{}\n", runtime.last_status()))
}

/// `exit`: ask the main loop to stop. Children are reaped by the caller.
pub fn builtin_exit() -> ExecutionResult {
    ExecutionResult::exit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Disposition;

    #[test]
    fn test_status_exit_value() {
        let mut runtime = Runtime::default();
        assert_eq!(builtin_status(&runtime).stdout, "exit value 0\n");
        runtime.set_last_status(Disposition::Exited(255));
        assert_eq!(builtin_status(&runtime).stdout, "exit value 255\n");
    }

    #[test]
    fn test_status_signal() {
        let mut runtime = Runtime::default();
        runtime.set_last_status(Disposition::Signaled(9));
        assert_eq!(builtin_status(&runtime).stdout, "terminated by signal 9\n");
    }

    #[test]
    fn test_cd_missing_directory() {
        let before = env::current_dir().unwrap();
        let result = builtin_cd(Some("/nonexistent/smallsh/dir"));
        assert_eq!(env::current_dir().unwrap(), before);
        assert!(result.stderr.starts_with("smallsh: cd: /nonexistent/smallsh/dir: "));
        assert!(result.stdout.is_empty());
        assert!(!result.exit_shell);
    }

    #[test]
    fn test_exit() {
        assert!(builtin_exit().exit_shell);
    }
}
