//! Domain types for keystroke classification.
//!
//! - [`key`] – Logical key values, timestamped key events, and the accepted
//!   [`Barcode`](key::Barcode) value.
//! - [`timing`] – The overridable thresholds that separate a scanner burst
//!   from human typing.
//! - [`isbn`] – The minimal ISBN token shape check (no checksum).

pub mod isbn;
pub mod key;
pub mod timing;

pub use isbn::{clean_candidate, is_plausible_isbn};
pub use key::{Barcode, KeyEvent, ScanKey};
pub use timing::{TimingConfig, TimingError};
