//! Timing thresholds for the keystroke classifier.
//!
//! Every threshold has a documented default and can be overridden, for
//! example from the `[timing]` section of the agent's TOML file or with
//! compressed values in tests.
//!
//! | Field                  | Default | Meaning                                         |
//! |------------------------|---------|-------------------------------------------------|
//! | `keystroke_timeout_ms` | 100     | Gap between keys that starts a new burst        |
//! | `max_scan_duration_ms` | 300     | Longest allowed time from first key to Enter    |
//! | `min_barcode_length`   | 8       | Shortest accepted candidate                     |
//! | `max_barcode_length`   | 18      | Longest accepted candidate                      |
//! | `min_isbn_length`      | 10      | ISBN-10 length (digits + optional `X`)          |
//! | `max_isbn_length`      | 13      | ISBN-13 length (digits only)                    |
//! | `min_keys_per_second`  | 50      | Scanner-speed floor for the whole burst         |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by [`TimingConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("min_barcode_length ({min}) is greater than max_barcode_length ({max})")]
    BarcodeLengthRange { min: usize, max: usize },
    #[error("min_isbn_length ({min}) is greater than max_isbn_length ({max})")]
    IsbnLengthRange { min: usize, max: usize },
    #[error("ISBN length {length} lies outside the barcode length range {min}..={max}")]
    IsbnOutsideBarcodeRange { length: usize, min: usize, max: usize },
}

/// Keystroke timing window and length rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_keystroke_timeout_ms")]
    pub keystroke_timeout_ms: u64,
    #[serde(default = "default_max_scan_duration_ms")]
    pub max_scan_duration_ms: u64,
    #[serde(default = "default_min_barcode_length")]
    pub min_barcode_length: usize,
    #[serde(default = "default_max_barcode_length")]
    pub max_barcode_length: usize,
    #[serde(default = "default_min_isbn_length")]
    pub min_isbn_length: usize,
    #[serde(default = "default_max_isbn_length")]
    pub max_isbn_length: usize,
    #[serde(default = "default_min_keys_per_second")]
    pub min_keys_per_second: u32,
}

fn default_keystroke_timeout_ms() -> u64 {
    100
}
fn default_max_scan_duration_ms() -> u64 {
    300
}
fn default_min_barcode_length() -> usize {
    8
}
fn default_max_barcode_length() -> usize {
    18
}
fn default_min_isbn_length() -> usize {
    10
}
fn default_max_isbn_length() -> usize {
    13
}
fn default_min_keys_per_second() -> u32 {
    50
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keystroke_timeout_ms: default_keystroke_timeout_ms(),
            max_scan_duration_ms: default_max_scan_duration_ms(),
            min_barcode_length: default_min_barcode_length(),
            max_barcode_length: default_max_barcode_length(),
            min_isbn_length: default_min_isbn_length(),
            max_isbn_length: default_max_isbn_length(),
            min_keys_per_second: default_min_keys_per_second(),
        }
    }
}

impl TimingConfig {
    pub fn keystroke_timeout(&self) -> Duration {
        Duration::from_millis(self.keystroke_timeout_ms)
    }

    pub fn max_scan_duration(&self) -> Duration {
        Duration::from_millis(self.max_scan_duration_ms)
    }

    /// Checks that the thresholds can describe at least one acceptable scan.
    ///
    /// # Errors
    ///
    /// Returns the first [`TimingError`] found.
    pub fn validate(&self) -> Result<(), TimingError> {
        if self.keystroke_timeout_ms == 0 {
            return Err(TimingError::Zero {
                field: "keystroke_timeout_ms",
            });
        }
        if self.max_scan_duration_ms == 0 {
            return Err(TimingError::Zero {
                field: "max_scan_duration_ms",
            });
        }
        if self.min_barcode_length == 0 {
            return Err(TimingError::Zero {
                field: "min_barcode_length",
            });
        }
        if self.min_barcode_length > self.max_barcode_length {
            return Err(TimingError::BarcodeLengthRange {
                min: self.min_barcode_length,
                max: self.max_barcode_length,
            });
        }
        if self.min_isbn_length > self.max_isbn_length {
            return Err(TimingError::IsbnLengthRange {
                min: self.min_isbn_length,
                max: self.max_isbn_length,
            });
        }
        for length in [self.min_isbn_length, self.max_isbn_length] {
            if length < self.min_barcode_length || length > self.max_barcode_length {
                return Err(TimingError::IsbnOutsideBarcodeRange {
                    length,
                    min: self.min_barcode_length,
                    max: self.max_barcode_length,
                });
            }
        }
        Ok(())
    }
}
