//! Focused-field capture: keys typed into one designated input field.
//!
//! The host UI owns the text field, so this source installs nothing in the
//! OS.  Instead it hands out a [`FocusedFieldHandle`] that the UI calls from
//! its key-press and focus-change handlers.  Keys are forwarded only while the
//! capture is started *and* the field reports that it has focus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use scan_core::{KeyEvent, ScanKey};

use super::{CaptureError, CaptureKind, CaptureSignal, InputCaptureSource, KeySender};

#[derive(Debug, Default)]
struct Shared {
    sink: RwLock<Option<KeySender>>,
    focused: AtomicBool,
}

/// Capture source fed by the host UI's designated input field.
#[derive(Debug, Default)]
pub struct FocusedFieldCapture {
    shared: Arc<Shared>,
}

/// Cloneable handle given to the host UI.
///
/// Calls made while the capture is stopped, or while the field does not have
/// focus, are ignored.
#[derive(Debug, Clone)]
pub struct FocusedFieldHandle {
    shared: Arc<Shared>,
}

impl FocusedFieldCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle the host UI uses to report focus and key presses.
    pub fn handle(&self) -> FocusedFieldHandle {
        FocusedFieldHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl InputCaptureSource for FocusedFieldCapture {
    fn kind(&self) -> CaptureKind {
        CaptureKind::FocusedField
    }

    fn start(&mut self, sink: KeySender) -> Result<(), CaptureError> {
        let mut guard = self.shared.sink.write().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }
        *guard = Some(sink);
        tracing::debug!("focused-field capture started");
        Ok(())
    }

    fn stop(&mut self) {
        let mut guard = self.shared.sink.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            tracing::debug!("focused-field capture stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.shared
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl FocusedFieldHandle {
    /// Reports whether the designated field currently owns keyboard focus.
    pub fn set_focus(&self, focused: bool) {
        self.shared.focused.store(focused, Ordering::SeqCst);
    }

    pub fn has_focus(&self) -> bool {
        self.shared.focused.load(Ordering::SeqCst)
    }

    /// Forwards a key pressed in the field, stamped with the current time.
    ///
    /// Returns `true` if the key was queued.
    pub fn key_pressed(&self, key: ScanKey) -> bool {
        self.key_pressed_at(key, Instant::now())
    }

    /// Forwards a character delivered by the UI toolkit.
    pub fn char_typed(&self, c: char) -> bool {
        self.key_pressed(ScanKey::from_char(c))
    }

    /// Forwards a key with an explicit timestamp.
    pub fn key_pressed_at(&self, key: ScanKey, at: Instant) -> bool {
        if !self.has_focus() {
            return false;
        }
        // Readers never exclude each other; only start/stop take the write side.
        let guard = self.shared.sink.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sink) => sink
                .try_send(CaptureSignal::Key {
                    event: KeyEvent::new(key, at),
                    source: CaptureKind::FocusedField,
                })
                .is_ok(),
            None => false,
        }
    }
}
