//! `$$` expansion
//!
//! Every complete `$$` pair in a token becomes the shell's own PID. Pairs are
//! matched left to right, so an odd run of `$` leaves one literal `$` at its
//! end. Tokens without the marker are borrowed unchanged.

use std::borrow::Cow;

/// The two-character token replaced by the shell PID.
pub const PID_MARKER: &str = "$$";

/// Replace each `$$` in `token` with `pid` rendered in decimal.
pub fn expand_pid(token: &str, pid: u32) -> Cow<'_, str> {
    if !token.contains(PID_MARKER) {
        return Cow::Borrowed(token);
    }

    let pid = pid.to_string();
    let mut expanded = String::with_capacity(token.len() + pid.len());
    let mut rest = token;
    while let Some(at) = rest.find(PID_MARKER) {
        expanded.push_str(&rest[..at]);
        expanded.push_str(&pid);
        rest = &rest[at + PID_MARKER.len()..];
    }
    expanded.push_str(rest);
    Cow::Owned(expanded)
}
