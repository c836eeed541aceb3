//! System-wide capture for targets without a supported hook facility.
//!
//! This exists so the crate (and binary) build everywhere.  Requests for
//! background capture fail cleanly and the mode manager falls back to
//! `Disabled`.

use super::{CaptureError, CaptureKind, InputCaptureSource, KeySender};

/// A global capture source whose `start` always fails.
#[derive(Debug, Default)]
pub struct UnsupportedGlobalCapture;

impl UnsupportedGlobalCapture {
    pub fn new() -> Self {
        Self
    }
}

impl InputCaptureSource for UnsupportedGlobalCapture {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Background
    }

    fn start(&mut self, _sink: KeySender) -> Result<(), CaptureError> {
        Err(CaptureError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }

    fn stop(&mut self) {}

    fn is_active(&self) -> bool {
        false
    }
}
