//! Mock capture source for unit and integration testing.
//!
//! Allows tests to inject synthetic keys and to script installation failures
//! without a running message loop or OS hook.  Clones share state, so a test
//! can hand one clone to the mode manager and keep another to inspect it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use scan_core::{KeyEvent, ScanKey};

use super::{CaptureError, CaptureKind, CaptureSignal, InputCaptureSource, KeySender};

#[derive(Debug, Default)]
struct MockState {
    sink: Option<KeySender>,
    fail_start: bool,
    start_calls: u32,
    stop_calls: u32,
}

/// A scriptable implementation of [`InputCaptureSource`].
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    kind: CaptureKind,
    state: Arc<Mutex<MockState>>,
}

impl MockCaptureSource {
    /// Creates an idle mock of the given kind.
    pub fn new(kind: CaptureKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Creates a mock whose `start` fails the way a refused hook install does.
    pub fn failing(kind: CaptureKind) -> Self {
        let mock = Self::new(kind);
        mock.set_fail_start(true);
        mock
    }

    /// Scripts whether subsequent `start` calls fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    /// Injects a key as if captured, stamped with the current time.
    ///
    /// Returns `false` if the source is not started or the queue is full.
    pub fn inject(&self, key: ScanKey) -> bool {
        self.inject_at(key, Instant::now())
    }

    /// Injects a key with an explicit timestamp.
    pub fn inject_at(&self, key: ScanKey, at: Instant) -> bool {
        let state = self.lock();
        match state.sink.as_ref() {
            Some(sink) => sink
                .try_send(CaptureSignal::Key {
                    event: KeyEvent::new(key, at),
                    source: self.kind,
                })
                .is_ok(),
            None => false,
        }
    }

    /// Number of times `start` was called, successful or not.
    pub fn start_calls(&self) -> u32 {
        self.lock().start_calls
    }

    /// Number of times `stop` was called.
    pub fn stop_calls(&self) -> u32 {
        self.lock().stop_calls
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputCaptureSource for MockCaptureSource {
    fn kind(&self) -> CaptureKind {
        self.kind
    }

    fn start(&mut self, sink: KeySender) -> Result<(), CaptureError> {
        let mut state = self.lock();
        if state.sink.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }
        state.start_calls += 1;
        if state.fail_start {
            return Err(CaptureError::HookInstallFailed(
                "scripted install failure".to_string(),
            ));
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.stop_calls += 1;
        // Drop the sender so the queue can disconnect.
        state.sink = None;
    }

    fn is_active(&self) -> bool {
        self.lock().sink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::key_channel;

    #[test]
    fn test_mock_source_starts_and_receives_keys() {
        // Arrange
        let (tx, rx) = key_channel();
        let mut source = MockCaptureSource::new(CaptureKind::Background);
        source.start(tx).expect("start should succeed");

        // Act
        let sent = source.inject(ScanKey::Digit(9));

        // Assert
        assert!(sent);
        let signal = rx.recv().expect("should receive key");
        assert!(matches!(
            signal,
            CaptureSignal::Key { source: CaptureKind::Background, .. }
        ));
    }

    #[test]
    fn test_mock_source_inject_before_start_is_dropped() {
        let source = MockCaptureSource::new(CaptureKind::FocusedField);
        assert!(!source.inject(ScanKey::Enter));
    }

    #[test]
    fn test_failing_mock_counts_the_attempt_and_stays_inactive() {
        // Arrange
        let (tx, _rx) = key_channel();
        let mut source = MockCaptureSource::failing(CaptureKind::Background);

        // Act
        let result = source.start(tx);

        // Assert
        assert!(matches!(result, Err(CaptureError::HookInstallFailed(_))));
        assert_eq!(source.start_calls(), 1);
        assert!(!source.is_active());
    }

    #[test]
    fn test_clones_share_state() {
        let (tx, _rx) = key_channel();
        let probe = MockCaptureSource::new(CaptureKind::Background);
        let mut owned = probe.clone();

        owned.start(tx).expect("start");

        assert!(probe.is_active());
        assert_eq!(probe.start_calls(), 1);
    }

    #[test]
    fn test_stop_without_start_and_twice_is_harmless() {
        // Arrange
        let mut source = MockCaptureSource::new(CaptureKind::Background);

        // Act
        source.stop();
        source.stop();

        // Assert
        assert_eq!(source.stop_calls(), 2);
        assert!(!source.is_active());
    }
}
