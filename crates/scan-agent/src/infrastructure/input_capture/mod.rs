//! Keystroke capture sources.
//!
//! A capture source observes key presses somewhere (inside one focused text
//! field, or system-wide through an OS hook) and forwards them as
//! [`CaptureSignal`]s into a bounded queue.  A single consumer drains that
//! queue and runs the keystroke classifier, so no classification ever
//! happens inside a native callback.
//!
//! # Hot-path rules
//!
//! OS hook callbacks run on a thread the OS may abandon if a callback is
//! slow, and a panic unwinding across the FFI boundary aborts the process.
//! Every producer therefore:
//!
//! - uses [`SyncSender::try_send`] and drops the key when the queue is full,
//! - never locks anything it could wait on,
//! - treats any unexpected state as "ignore this key".
//!
//! # Testability
//!
//! The [`InputCaptureSource`] trait lets the mode manager and its tests run
//! against [`mock::MockCaptureSource`] without installing real hooks.

use std::sync::mpsc::{self, Receiver, SyncSender};

use scan_core::KeyEvent;

pub mod focused;
pub mod mock;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub mod unsupported;

pub use focused::{FocusedFieldCapture, FocusedFieldHandle};
pub use mock::MockCaptureSource;

/// Capacity of the key queue between capture sources and the dispatcher.
///
/// A scanner burst is under 20 keys, so this absorbs many bursts even if the
/// consumer stalls briefly.
pub const KEY_QUEUE_CAPACITY: usize = 1024;

/// Where a key was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// Inside the host application's designated input field.
    FocusedField,
    /// System-wide, regardless of which application has focus.
    Background,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureKind::FocusedField => f.write_str("focused-field"),
            CaptureKind::Background => f.write_str("background"),
        }
    }
}

/// A message on the key queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSignal {
    /// A key press observed by a capture source.
    Key { event: KeyEvent, source: CaptureKind },
    /// Discard any partially buffered burst.  Sent on every mode change.
    Reset,
}

/// Producer half of the key queue.
pub type KeySender = SyncSender<CaptureSignal>;

/// Creates the bounded key queue with [`KEY_QUEUE_CAPACITY`] slots.
pub fn key_channel() -> (KeySender, Receiver<CaptureSignal>) {
    mpsc::sync_channel(KEY_QUEUE_CAPACITY)
}

/// Error type for capture source operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to install keyboard hook: {0}")]
    HookInstallFailed(String),
    #[error("input monitoring permission not granted")]
    PermissionDenied,
    #[error("system-wide capture is not supported on {0}")]
    UnsupportedPlatform(String),
    #[error("capture source is already running")]
    AlreadyRunning,
    #[error("failed to spawn capture thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

/// A source of captured key presses.
///
/// Implementations own whatever OS resource they install and release it in
/// [`stop`](Self::stop) (and on drop).  `stop` is idempotent: calling it twice,
/// or without a prior `start`, is a no-op.
pub trait InputCaptureSource: Send {
    /// Which context this source observes.
    fn kind(&self) -> CaptureKind;

    /// Begins forwarding keys into `sink`.
    ///
    /// Returns [`CaptureError::AlreadyRunning`] if the source is active.
    /// Installation failures are reported here, synchronously.
    fn start(&mut self, sink: KeySender) -> Result<(), CaptureError>;

    /// Stops forwarding keys and releases any OS resource.
    fn stop(&mut self);

    /// Returns `true` between a successful `start` and the next `stop`.
    fn is_active(&self) -> bool;
}

/// Returns the system-wide capture source for the compile target.
///
/// Windows uses a low-level keyboard hook, macOS a CoreGraphics event tap.
/// Every other target gets a source whose `start` always fails.
pub fn platform_global_capture() -> Box<dyn InputCaptureSource> {
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsGlobalCapture::new())
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacosGlobalCapture::new())
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Box::new(unsupported::UnsupportedGlobalCapture::new())
    }
}
