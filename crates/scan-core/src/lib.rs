//! # scan-core
//!
//! Shared library for the ISBN scan agent containing the keystroke
//! classifier, the timing rules it applies, and the key code translation
//! tables used by the platform capture hooks.
//!
//! It has zero dependencies on OS APIs, UI frameworks, or threads, so every
//! rule in here can be exercised from plain unit tests with synthetic
//! timestamps.
//!
//! # Architecture overview (for beginners)
//!
//! A USB barcode scanner in "keyboard wedge" mode pretends to be a keyboard.
//! When it reads a barcode it types the encoded digits very quickly and then
//! presses Enter.  A person typing on the same machine produces exactly the
//! same kind of key events, only slower and less regular.
//!
//! This crate decides, one key at a time, whether the text typed since the
//! last pause looks like a scanner burst:
//!
//! - **`domain`** – The vocabulary: [`ScanKey`], [`KeyEvent`], [`Barcode`],
//!   the [`TimingConfig`] thresholds, and the ISBN token rule.
//!
//! - **`classifier`** – The [`KeystrokeClassifier`] state machine.  It owns
//!   the scan buffer and returns `Some(Barcode)` only when an Enter key closes
//!   a burst that is long enough, fast enough, short enough in wall-clock
//!   time, and shaped like an ISBN.
//!
//! - **`keymap`** – Translation tables from Windows Virtual Key codes and
//!   macOS `CGKeyCode`s to [`ScanKey`].

pub mod classifier;
pub mod domain;
pub mod keymap;

pub use classifier::{ClassifierStats, KeystrokeClassifier, RejectReason};
pub use domain::isbn::{clean_candidate, is_plausible_isbn};
pub use domain::key::{Barcode, KeyEvent, ScanKey};
pub use domain::timing::{TimingConfig, TimingError};
pub use keymap::KeyMapper;
