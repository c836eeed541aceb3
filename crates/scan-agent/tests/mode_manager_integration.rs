//! Integration tests for the scanner mode manager's consent gate, idempotent
//! stop, and hook-failure fallback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use scan_agent::application::mode_manager::{
    CaptureMode, ConsentPrompt, ModeError, ModeOutcome, ScannerModeManager,
};
use scan_agent::infrastructure::input_capture::{
    key_channel, CaptureKind, FocusedFieldCapture, InputCaptureSource, MockCaptureSource,
};

/// Answers every consent request the same way and counts the requests.
struct CountingPrompt {
    answer: bool,
    asked: AtomicUsize,
}

impl CountingPrompt {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentPrompt for CountingPrompt {
    async fn request_consent(&self, _notice: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

fn manager_with(prompt: Arc<CountingPrompt>, global: MockCaptureSource) -> ScannerModeManager {
    let (tx, _rx) = key_channel();
    ScannerModeManager::new(
        Box::new(FocusedFieldCapture::new()),
        Box::new(global),
        prompt,
        tx,
    )
}

// ── Consent state machine ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_decline_prompts_once_and_ends_disabled() {
    // Arrange
    let prompt = CountingPrompt::new(false);
    let global = MockCaptureSource::new(CaptureKind::Background);
    let mut manager = manager_with(Arc::clone(&prompt), global.clone());

    // Act
    let outcome = manager
        .set_mode(CaptureMode::BackgroundService)
        .await
        .expect("decline is not an error");

    // Assert
    assert_eq!(outcome, ModeOutcome::ConsentDeclined);
    assert_eq!(prompt.asked(), 1);
    assert_eq!(manager.mode(), CaptureMode::Disabled);
    assert!(!manager.background_mode_enabled());
    assert!(!global.is_active());
}

#[tokio::test]
async fn test_accept_starts_global_capture_and_never_prompts_again() {
    // Arrange
    let prompt = CountingPrompt::new(true);
    let global = MockCaptureSource::new(CaptureKind::Background);
    let mut manager = manager_with(Arc::clone(&prompt), global.clone());

    // Act
    manager.set_mode(CaptureMode::BackgroundService).await.unwrap();
    let enabled_after_first = manager.background_mode_enabled();
    manager.set_mode(CaptureMode::Disabled).await.unwrap();
    manager.set_mode(CaptureMode::BackgroundService).await.unwrap();

    // Assert
    assert!(enabled_after_first);
    assert_eq!(prompt.asked(), 1);
    assert!(global.is_active());
    assert_eq!(global.start_calls(), 2);
    assert_eq!(manager.mode(), CaptureMode::BackgroundService);
}

#[tokio::test]
async fn test_declined_user_may_be_asked_again_on_a_later_request() {
    let prompt = CountingPrompt::new(false);
    let mut manager = manager_with(
        Arc::clone(&prompt),
        MockCaptureSource::new(CaptureKind::Background),
    );

    manager.set_mode(CaptureMode::BackgroundService).await.unwrap();
    manager.set_mode(CaptureMode::BackgroundService).await.unwrap();

    assert_eq!(prompt.asked(), 2);
}

// ── Idempotent stop ───────────────────────────────────────────────────────────

#[test]
fn test_stop_twice_or_without_start_leaves_no_source_active() {
    // Arrange
    let (tx, _rx) = key_channel();
    let mut never_started = MockCaptureSource::new(CaptureKind::Background);
    let mut started = MockCaptureSource::new(CaptureKind::Background);
    let mut focused = FocusedFieldCapture::new();
    started.start(tx.clone()).unwrap();
    focused.start(tx).unwrap();

    // Act
    never_started.stop();
    started.stop();
    started.stop();
    focused.stop();
    focused.stop();

    // Assert
    assert!(!never_started.is_active());
    assert!(!started.is_active());
    assert!(!focused.is_active());
}

#[test]
fn test_platform_global_capture_stop_without_start_is_harmless() {
    let mut global = scan_agent::infrastructure::input_capture::platform_global_capture();
    global.stop();
    global.stop();
    assert!(!global.is_active());
}

// ── Hook failure fallback ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_hook_failure_reports_once_and_ends_disabled() {
    // Arrange
    let prompt = CountingPrompt::new(true);
    let global = MockCaptureSource::failing(CaptureKind::Background);
    let mut manager = manager_with(Arc::clone(&prompt), global.clone());

    // Act
    let result = manager.set_mode(CaptureMode::BackgroundService).await;

    // Assert
    assert!(matches!(result, Err(ModeError::HookInstallation(_))));
    assert_eq!(global.start_calls(), 1, "no retry loop");
    assert_eq!(manager.mode(), CaptureMode::Disabled);
    assert!(!manager.background_mode_enabled());
    assert!(!global.is_active());
}

#[tokio::test]
async fn test_recovered_hook_can_be_installed_on_a_later_request() {
    // Arrange
    let prompt = CountingPrompt::new(true);
    let global = MockCaptureSource::failing(CaptureKind::Background);
    let mut manager = manager_with(Arc::clone(&prompt), global.clone());
    let _ = manager.set_mode(CaptureMode::BackgroundService).await;

    // Act
    global.set_fail_start(false);
    let outcome = manager.set_mode(CaptureMode::BackgroundService).await;

    // Assert
    assert_eq!(
        outcome.unwrap(),
        ModeOutcome::Applied(CaptureMode::BackgroundService)
    );
    assert_eq!(prompt.asked(), 1);
    assert!(global.is_active());
}

#[tokio::test]
async fn test_unsupported_platform_falls_back_to_disabled() {
    // Only meaningful where no real hook exists; elsewhere this would install one.
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        return;
    }
    let (tx, _rx) = key_channel();
    let mut manager = ScannerModeManager::new(
        Box::new(FocusedFieldCapture::new()),
        scan_agent::infrastructure::input_capture::platform_global_capture(),
        CountingPrompt::new(true),
        tx,
    );

    let result = manager.set_mode(CaptureMode::BackgroundService).await;

    assert!(matches!(result, Err(ModeError::HookInstallation(_))));
    assert_eq!(manager.mode(), CaptureMode::Disabled);
}
