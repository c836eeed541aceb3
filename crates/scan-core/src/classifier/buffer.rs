//! The scan buffer: characters of the current burst plus its timing marks.

use std::time::Instant;

/// Characters accumulated since the last reset.
///
/// `scan_start` is the moment the current burst began (the key that caused
/// the most recent reset).  `last_key` is the moment of the most recent key,
/// whether or not it was appended.
#[derive(Debug, Default)]
pub struct ScanBuffer {
    chars: String,
    scan_start: Option<Instant>,
    last_key: Option<Instant>,
    capacity: usize,
}

impl ScanBuffer {
    /// Creates an empty buffer that stops growing after `capacity` characters.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chars: String::with_capacity(capacity),
            scan_start: None,
            last_key: None,
            capacity,
        }
    }

    /// Starts a new burst at `now`, discarding any pending characters.
    pub fn restart(&mut self, now: Instant) {
        self.chars.clear();
        self.scan_start = Some(now);
    }

    /// Forgets everything, including the timing marks.
    pub fn clear(&mut self) {
        self.chars.clear();
        self.scan_start = None;
        self.last_key = None;
    }

    /// Appends `c` unless the buffer is already full.
    ///
    /// A full buffer already fails the length rule on Enter.
    pub fn push(&mut self, c: char) {
        if self.chars.len() < self.capacity {
            self.chars.push(c);
        }
    }

    /// Moves the pending characters out, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.chars)
    }

    pub fn mark_key(&mut self, now: Instant) {
        self.last_key = Some(now);
    }

    pub fn last_key(&self) -> Option<Instant> {
        self.last_key
    }

    pub fn scan_start(&self) -> Option<Instant> {
        self.scan_start
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}
