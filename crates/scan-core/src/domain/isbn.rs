//! Minimal ISBN token shape check.
//!
//! This is not a checksum validator.  It only answers "could this
//! string be an ISBN-10 or ISBN-13?", which is enough to keep ordinary words
//! and passwords typed quickly before Enter from ever being emitted.

/// Removes the `-` and space separators that sometimes appear in printed
/// ISBNs, and trims surrounding whitespace.
pub fn clean_candidate(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '-' && *c != ' ').collect()
}

/// Returns `true` when `code` has the shape of an ISBN.
///
/// - At `max_isbn_length` (13 by default) every character must be a digit.
/// - At `min_isbn_length` (10 by default) every character must be a digit,
///   except that the last one may be an upper-case `X`.
/// - Any other length is rejected.
pub fn is_plausible_isbn(code: &str, min_isbn_length: usize, max_isbn_length: usize) -> bool {
    let bytes = code.as_bytes();
    let len = bytes.len();

    if len == min_isbn_length && len > 0 {
        let (body, last) = bytes.split_at(len - 1);
        if body.iter().all(u8::is_ascii_digit) && (last[0].is_ascii_digit() || last[0] == b'X') {
            return true;
        }
    }

    len == max_isbn_length && len > 0 && bytes.iter().all(u8::is_ascii_digit)
}
