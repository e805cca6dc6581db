//! Drives the real binary over pipes.

#![allow(dead_code)]

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const PROMPT: &str = ": ";

pub struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    output: Arc<Mutex<String>>,
}

impl Session {
    pub fn start() -> Self {
        Self::start_with(&[], &[])
    }

    pub fn start_with(args: &[&str], env: &[(&str, &str)]) -> Self {
        let mut command = Command::new(env!("CARGO_BIN_EXE_smallsh"));
        command
            .args(args)
            .env_remove("SMALLSH_REAPER")
            .env_remove("SMALLSH_PROMPT")
            .env_remove("SMALLSH_JOB_SLOTS")
            .env_remove("SMALLSH_ERROR_FORMAT")
            .env("SMALLSH_LOG", "off")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in env {
            command.env(key, value);
        }
        let mut child = command.spawn().expect("failed to spawn smallsh");

        let output = Arc::new(Mutex::new(String::new()));
        let mut stdout = child.stdout.take().unwrap();
        let mut stderr = child.stderr.take().unwrap();
        let out_sink = Arc::clone(&output);
        thread::spawn(move || pump(&mut stdout, &out_sink));
        let err_sink = Arc::clone(&output);
        thread::spawn(move || pump(&mut stderr, &err_sink));

        let stdin = child.stdin.take();
        Self {
            child,
            stdin,
            output,
        }
    }

    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    pub fn send(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        writeln!(stdin, "{}", line).unwrap();
        stdin.flush().unwrap();
    }

    pub fn signal(&self, signal: Signal) {
        kill(self.pid(), signal).unwrap();
    }

    pub fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }

    /// Wait until `check` accepts the combined output.
    pub fn wait_until<F: Fn(&str) -> bool>(&self, check: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if check(&self.output()) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    /// Wait until `pattern` appears `count` times in the combined output.
    pub fn wait_for_count(&self, pattern: &str, count: usize, timeout: Duration) -> bool {
        self.wait_until(|out| out.matches(pattern).count() >= count, timeout)
    }

    pub fn wait_for(&self, pattern: &str, timeout: Duration) -> bool {
        self.wait_for_count(pattern, 1, timeout)
    }

    /// Close stdin and wait for the shell to leave.
    pub fn finish(mut self) -> (Option<i32>, String) {
        drop(self.stdin.take());
        let status = self.child.wait().unwrap();
        // Let the pump threads drain what is left in the pipes.
        thread::sleep(Duration::from_millis(100));
        (status.code(), self.output())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn pump(source: &mut impl Read, sink: &Mutex<String>) {
    let mut buf = [0u8; 1024];
    loop {
        match source.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => sink
                .lock()
                .unwrap()
                .push_str(&String::from_utf8_lossy(&buf[..n])),
        }
    }
}
