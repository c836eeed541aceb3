//! Logical key values and timestamped key events.
//!
//! Capture sources translate whatever the platform hands them (a Windows VK
//! code, a macOS `CGKeyCode`, a character from a UI toolkit) into a
//! [`ScanKey`].  The classifier only ever sees `ScanKey`s, so it does not care
//! where a key came from.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The logical value of a captured key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKey {
    /// A digit key, `0..=9`.  Top-row and numeric keypad digits both map here.
    Digit(u8),
    /// An ASCII letter key, always stored upper-case (`'A'..='Z'`).
    Letter(char),
    /// Enter / Return, including the numeric keypad Enter.
    Enter,
    /// Any other key (modifiers, punctuation, navigation, function keys).
    Other,
}

impl ScanKey {
    /// Maps a character delivered by a UI toolkit to a `ScanKey`.
    ///
    /// Letters are folded to upper case.  `'\r'` and `'\n'` are Enter.
    /// Anything that is not an ASCII digit or letter is [`ScanKey::Other`].
    pub fn from_char(c: char) -> Self {
        match c {
            '0'..='9' => ScanKey::Digit(c as u8 - b'0'),
            'a'..='z' | 'A'..='Z' => ScanKey::Letter(c.to_ascii_uppercase()),
            '\r' | '\n' => ScanKey::Enter,
            _ => ScanKey::Other,
        }
    }

    /// Returns the buffer character for this key, or `None` when the key is
    /// not part of a barcode (Enter and [`ScanKey::Other`]).
    pub fn to_char(self) -> Option<char> {
        match self {
            ScanKey::Digit(d) if d <= 9 => Some(char::from(b'0' + d)),
            ScanKey::Letter(c) if c.is_ascii_uppercase() => Some(c),
            _ => None,
        }
    }

    /// Returns `true` for [`ScanKey::Enter`].
    pub fn is_enter(self) -> bool {
        matches!(self, ScanKey::Enter)
    }
}

/// A key press stamped with the moment it was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: ScanKey,
    pub at: Instant,
}

impl KeyEvent {
    pub fn new(key: ScanKey, at: Instant) -> Self {
        Self { key, at }
    }

    /// Stamps `key` with the current time.
    pub fn now(key: ScanKey) -> Self {
        Self::new(key, Instant::now())
    }
}

/// A barcode accepted by the classifier.
///
/// Holds the cleaned candidate: digits, plus an optional trailing `X` for a
/// 10-character ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Barcode(String);

impl Barcode {
    pub(crate) fn new(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Barcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for Barcode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for Barcode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
