//! Shared helpers for the process- and HTTP-backed adapters.

use std::time::Duration;

use crate::error::CollaboratorError;

/// HTTP agent with bounded connect and read timeouts.
pub(super) fn http_agent(connect: Duration, read: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(connect)
        .timeout_read(read)
        .user_agent(concat!("homeguard/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Fold a `ureq` failure into a collaborator error.
pub(super) fn http_error(e: ureq::Error) -> CollaboratorError {
    match e {
        ureq::Error::Status(code, _) => CollaboratorError::FetchStatus(code),
        ureq::Error::Transport(t) => CollaboratorError::Transport(t.to_string()),
    }
}

/// Remove ANSI escape sequences (`ESC [ … final-byte`) and carriage returns.
///
/// `gatttool -I` decorates its prompt with colour codes and redraws the
/// line with `\r`.
pub(super) fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
            }
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Parse space-separated hex bytes (`"30 2c 31"`).
pub(super) fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    s.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).ok())
        .collect()
}

/// Lower-case hex without separators, as `char-write-req` expects.
pub(super) fn hex_string(data: &[u8]) -> String {
    use core::fmt::Write as _;
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{b:02x}");
    }
    out
}
