//! Allocation-free output for signal handlers and freshly forked children.
//!
//! Nothing in here takes a lock, touches the heap, or goes through the
//! formatting machinery. Text is assembled in a [`StackBuf`] and handed to
//! `write(2)` in one call.

use libc::c_int;
use nix::errno::Errno;

pub const STDOUT: c_int = libc::STDOUT_FILENO;
pub const STDERR: c_int = libc::STDERR_FILENO;

/// Write all of `bytes` to `fd`, retrying short writes and `EINTR`.
///
/// Failures are dropped: callers run where no error channel exists.
pub fn write_all(fd: c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: the pointer/length pair comes from a live slice.
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if Errno::last() == Errno::EINTR {
                continue;
            }
            return;
        }
        if n == 0 {
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

/// Fixed-capacity text buffer living on the stack.
///
/// Pushing past the capacity truncates instead of failing.
pub struct StackBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> StackBuf<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let room = N - self.len;
        let take = bytes.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
        self
    }

    /// Append the decimal rendering of `value`.
    pub fn push_decimal(&mut self, value: i64) -> &mut Self {
        let mut digits = [0u8; 20];
        let mut i = digits.len();
        let negative = value < 0;
        let mut rest = value.unsigned_abs();
        loop {
            i -= 1;
            digits[i] = b'0' + (rest % 10) as u8;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        if negative {
            self.push_bytes(b"-");
        }
        self.push_bytes(&digits[i..])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn write_to(&self, fd: c_int) {
        write_all(fd, self.as_bytes());
    }
}

impl<const N: usize> Default for StackBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}
