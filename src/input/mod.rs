//! Line input for the prompt loop.
//!
//! `BufRead::read_line` retries `EINTR` internally, which would hide the
//! SIGTSTP toggle from the loop. [`read_line`] hands `Interrupted` back to
//! the caller instead and drops any partial line read before it.

use std::io::{self, BufRead};

/// Append one line (newline included) to `line`.
///
/// Returns the number of bytes appended; 0 means end of input. Bytes that
/// are not UTF-8 give `ErrorKind::InvalidData` and are consumed.
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R, line: &mut String) -> io::Result<usize> {
    let mut bytes = Vec::new();
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                bytes.extend_from_slice(&available[..=end]);
                reader.consume(end + 1);
                break;
            }
            None => {
                let taken = available.len();
                bytes.extend_from_slice(available);
                reader.consume(taken);
            }
        }
    }

    let text = String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    line.push_str(&text);
    Ok(text.len())
}
