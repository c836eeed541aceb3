//! KeystrokeClassifier: decides whether a burst of keys came from a scanner.
//!
//! The classifier is a pure, synchronous state machine.  It consumes one key
//! at a time together with the moment the key was delivered, and returns
//! `Some(Barcode)` only when an Enter key closes a burst that passes every
//! acceptance rule.
//!
//! # Algorithm
//!
//! For every key:
//!
//! 1. If this is the first key ever seen, or the gap since the previous key is
//!    longer than `keystroke_timeout_ms`, the buffer is cleared and the burst
//!    restarts at this key.
//! 2. The key time is recorded.
//! 3. Enter takes the buffer as the candidate, clears it (timing marks
//!    included, so the next key opens a new burst), and runs the acceptance
//!    check.
//! 4. Digits and letters are appended.  Everything else is ignored.
//!
//! The acceptance check fails fast, in this order:
//!
//! ```text
//! non-empty  →  length in [min, max]  →  elapsed ≤ max duration
//!            →  keys/second ≥ floor  →  ISBN token shape
//! ```
//!
//! # Silence
//!
//! A rejected candidate is not an error.  Almost every rejection is a person
//! typing something and pressing Enter, so rejection produces no value and at
//! most a `trace!` line carrying the reason and the length, never the text.
//!
//! # Duration window
//!
//! The duration is measured from the key that started the current burst (the
//! last reset point), not from an earlier "logical" scan start.  A burst that
//! was split by a pause is judged only on its tail.

mod buffer;

use std::time::Instant;

use tracing::{debug, trace};

use crate::domain::isbn::{clean_candidate, is_plausible_isbn};
use crate::domain::key::{Barcode, KeyEvent, ScanKey};
use crate::domain::timing::TimingConfig;

pub use buffer::ScanBuffer;

/// Why a candidate closed by Enter was not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Enter with nothing buffered.
    Empty,
    /// Candidate length outside `[min_barcode_length, max_barcode_length]`.
    Length(usize),
    /// The burst took longer than `max_scan_duration_ms`.
    TooLong { elapsed_ms: u128 },
    /// The average key rate was below `min_keys_per_second`.
    TooSlow,
    /// The text does not have the shape of an ISBN.
    NotIsbn,
}

/// Running counters.  Never holds key content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierStats {
    pub keys_observed: u64,
    pub buffer_resets: u64,
    pub scans_accepted: u64,
    pub candidates_rejected: u64,
}

/// The keystroke classifier.  See the module docs for the rules.
#[derive(Debug)]
pub struct KeystrokeClassifier {
    config: TimingConfig,
    buffer: ScanBuffer,
    stats: ClassifierStats,
}

impl KeystrokeClassifier {
    /// Creates a classifier with an empty buffer.
    pub fn new(config: TimingConfig) -> Self {
        let capacity = config.max_barcode_length.saturating_add(1);
        Self {
            config,
            buffer: ScanBuffer::with_capacity(capacity),
            stats: ClassifierStats::default(),
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    /// Number of characters waiting for an Enter key.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discards the pending burst, e.g. when the capture source changes.
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            self.stats.buffer_resets += 1;
        }
        self.buffer.clear();
    }

    /// Convenience wrapper around [`on_key_press`](Self::on_key_press).
    pub fn on_key_event(&mut self, event: KeyEvent) -> Option<Barcode> {
        self.on_key_press(event.key, event.at)
    }

    /// Feeds one key delivered at `now`.
    ///
    /// Returns the cleaned barcode when `key` is Enter and the buffered burst
    /// passes every acceptance rule.  This runs in constant time per key.
    pub fn on_key_press(&mut self, key: ScanKey, now: Instant) -> Option<Barcode> {
        self.stats.keys_observed += 1;

        let timed_out = match self.buffer.last_key() {
            Some(last) => now.saturating_duration_since(last) > self.config.keystroke_timeout(),
            None => true,
        };
        if timed_out {
            if !self.buffer.is_empty() {
                self.stats.buffer_resets += 1;
            }
            self.buffer.restart(now);
        }
        self.buffer.mark_key(now);

        if key.is_enter() {
            let candidate = self.buffer.take();
            let start = self.buffer.scan_start().unwrap_or(now);
            // A decision ends the burst; the next key opens a new one.
            self.buffer.clear();
            return match self.evaluate(&candidate, start, now) {
                Ok(code) => {
                    self.stats.scans_accepted += 1;
                    debug!(length = code.len(), "barcode accepted");
                    Some(code)
                }
                Err(reason) => {
                    self.stats.candidates_rejected += 1;
                    trace!(?reason, length = candidate.len(), "candidate rejected");
                    None
                }
            };
        }

        if let Some(c) = key.to_char() {
            self.buffer.push(c);
        }
        None
    }

    /// Runs the acceptance rules against a candidate closed at `now`.
    fn evaluate(
        &self,
        candidate: &str,
        start: Instant,
        now: Instant,
    ) -> Result<Barcode, RejectReason> {
        let cfg = &self.config;

        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(RejectReason::Empty);
        }

        let length = trimmed.chars().count();
        if length < cfg.min_barcode_length || length > cfg.max_barcode_length {
            return Err(RejectReason::Length(length));
        }

        let elapsed = now.saturating_duration_since(start);
        if elapsed > cfg.max_scan_duration() {
            return Err(RejectReason::TooLong {
                elapsed_ms: elapsed.as_millis(),
            });
        }

        // keys / secs >= floor, in integer nanoseconds.
        let nanos = elapsed.as_nanos();
        if nanos > 0
            && (length as u128) * 1_000_000_000 < u128::from(cfg.min_keys_per_second) * nanos
        {
            return Err(RejectReason::TooSlow);
        }

        let cleaned = clean_candidate(trimmed);
        if !is_plausible_isbn(&cleaned, cfg.min_isbn_length, cfg.max_isbn_length) {
            return Err(RejectReason::NotIsbn);
        }

        Ok(Barcode::new(cleaned))
    }
}

impl Default for KeystrokeClassifier {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}
