//! Helpers that keep untrusted text (names, scanned payloads) on one bounded log line.

use std::fmt::Write;

const MAX_PREVIEW: usize = 120;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters => `\\xNN`
///
/// Output is cut at [`MAX_PREVIEW`] characters with an ellipsis.
pub fn escape_log(s: &str) -> String {
    escape_bounded(s, MAX_PREVIEW)
}

fn escape_bounded(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Short description of a scanned sync payload: its length and an escaped head.
/// Payloads run to thousands of characters, so only the start is logged.
pub fn payload_preview(payload: &str) -> String {
    format!("len={} head={}", payload.len(), escape_bounded(payload, 24))
}
