//! Terminal display width helpers.
//!
//! Content arriving from the component layer may still carry ANSI styling.
//! Escapes are stripped before measurement so layout works in visible cells.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    if !text.contains('\x1b') {
        return UnicodeWidthStr::width(text);
    }
    UnicodeWidthStr::width(sanitize(text).as_str())
}

/// Remove ANSI escape sequences, leaving only printable content.
pub fn sanitize(text: &str) -> String {
    if !text.contains('\x1b') {
        return text.to_string();
    }
    let clean = strip_ansi_escapes::strip(text);
    String::from_utf8_lossy(&clean).into_owned()
}

/// Cell width of a single character. Control characters occupy no cells.
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Split `text` at the last character boundary that keeps the prefix within
/// `max` cells. Returns the prefix and the remainder.
pub fn split_at_width(text: &str, max: usize) -> (&str, &str) {
    let mut used = 0;
    for (idx, ch) in text.char_indices() {
        let w = char_width(ch);
        if used + w > max {
            return text.split_at(idx);
        }
        used += w;
    }
    (text, "")
}
