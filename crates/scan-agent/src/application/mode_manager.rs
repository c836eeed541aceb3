//! ScannerModeManager: decides where keystrokes are observed.
//!
//! The manager owns two capture sources (the focused input field and the
//! system-wide hook) and keeps at most one of them live, according to the
//! requested [`CaptureMode`]:
//!
//! ```text
//!                 set_mode(FocusedFieldOnly)
//!   Disabled ────────────────────────────────────► FocusedFieldOnly
//!      ▲  ▲                                              │
//!      │  └──── consent declined / hook install failed ──┤ set_mode(BackgroundService)
//!      │                                                 ▼
//!      └────────────── set_mode(Disabled) ◄──────── BackgroundService
//! ```
//!
//! # Consent gate
//!
//! `BackgroundService` is reachable only after the user agreed to
//! system-wide keystroke observation.  The first request in a session asks
//! through the [`ConsentPrompt`]; a yes is remembered for the session (or
//! seeded from configuration), a no leaves the manager `Disabled` with
//! [`background_mode_enabled`](ScannerModeManager::background_mode_enabled)
//! `false`.  Declining is a user decision, not an error.
//!
//! # Invariants
//!
//! - The global source is active iff the mode is `BackgroundService`.
//! - Every mode change puts a [`CaptureSignal::Reset`] on the key queue, so a
//!   partial burst never spans two sources.
//! - `shutdown` (also run on drop) leaves no source active.

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::TrySendError;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::input_capture::{
    CaptureError, CaptureSignal, InputCaptureSource, KeySender,
};

/// Text shown to the user before system-wide capture is installed.
pub const CONSENT_NOTICE: &str = "\
Background scanning watches every key typed on this computer, in every \
application, so that a barcode scanner works even when this window is not \
in front.

Only fast bursts that look like an ISBN and end with Enter are kept. \
Ordinary typing, including passwords, is discarded as it arrives and is \
never stored or reported.

You can turn background scanning off at any time.";

/// Where keystrokes are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// No capture at all.
    Disabled,
    /// Only keys typed into the host application's designated field.
    #[default]
    FocusedFieldOnly,
    /// Every key on the system, through an OS hook.
    BackgroundService,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureMode::Disabled => "disabled",
            CaptureMode::FocusedFieldOnly => "focused_field_only",
            CaptureMode::BackgroundService => "background_service",
        })
    }
}

/// Error returned when a string is not a known [`CaptureMode`].
#[derive(Debug, Error)]
#[error("unknown capture mode '{0}' (expected disabled, focused_field_only, or background_service)")]
pub struct ParseModeError(String);

impl FromStr for CaptureMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "disabled" | "off" => Ok(CaptureMode::Disabled),
            "focused_field_only" | "focused" => Ok(CaptureMode::FocusedFieldOnly),
            "background_service" | "background" => Ok(CaptureMode::BackgroundService),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Whether the user agreed to system-wide capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentState {
    pub background_mode_granted: bool,
}

/// Result of a successful mode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    /// The manager is now in the given mode.
    Applied(CaptureMode),
    /// The user declined consent; the manager is `Disabled`.
    ConsentDeclined,
}

/// Error type for mode transitions.
#[derive(Debug, Error)]
pub enum ModeError {
    /// The system-wide hook could not be installed.  The manager is `Disabled`.
    #[error("background capture could not be started: {0}")]
    HookInstallation(#[from] CaptureError),
    /// The focused-field source refused to start.
    #[error("focused-field capture could not be started: {0}")]
    FocusedCapture(#[source] CaptureError),
}

/// Host window lifecycle events the manager reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    Minimized,
    Restored,
    Activated,
    Deactivated,
    /// The user flipped the background-scanning switch.
    UserToggle(bool),
}

/// Asks the user a yes/no question about system-wide capture.
///
/// Infrastructure implementations talk to a terminal or a dialog; tests
/// use the `mockall` generated `MockConsentPrompt`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Presents `notice` and resolves to `true` if the user agrees.
    async fn request_consent(&self, notice: &str) -> bool;
}

/// Orchestrates the capture sources.  See the module docs.
pub struct ScannerModeManager {
    focused: Box<dyn InputCaptureSource>,
    global: Box<dyn InputCaptureSource>,
    prompt: Arc<dyn ConsentPrompt>,
    sink: KeySender,
    mode: CaptureMode,
    consent: ConsentState,
    background_enabled: bool,
    focused_suspended: bool,
}

impl ScannerModeManager {
    /// Creates a `Disabled` manager.  No source is started until
    /// [`set_mode`](Self::set_mode) is called.
    pub fn new(
        focused: Box<dyn InputCaptureSource>,
        global: Box<dyn InputCaptureSource>,
        prompt: Arc<dyn ConsentPrompt>,
        sink: KeySender,
    ) -> Self {
        Self {
            focused,
            global,
            prompt,
            sink,
            mode: CaptureMode::Disabled,
            consent: ConsentState::default(),
            background_enabled: false,
            focused_suspended: false,
        }
    }

    /// Seeds the consent state, e.g. from a persisted earlier decision.
    pub fn with_consent(mut self, consent: ConsentState) -> Self {
        self.consent = consent;
        self
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// `true` while system-wide capture is installed.  Callers use this to
    /// keep a UI toggle in sync after a decline or failure.
    pub fn background_mode_enabled(&self) -> bool {
        self.background_enabled
    }

    pub fn consent_state(&self) -> ConsentState {
        self.consent
    }

    /// Switches to `requested`.
    ///
    /// Requesting `BackgroundService` without prior consent awaits the
    /// consent prompt.  Requesting the current mode is a no-op.
    ///
    /// # Errors
    ///
    /// [`ModeError::HookInstallation`] if the system-wide hook could not be
    /// installed; the manager is then `Disabled`.  Reported once per request.
    pub async fn set_mode(&mut self, requested: CaptureMode) -> Result<ModeOutcome, ModeError> {
        if requested == self.mode && !self.focused_suspended {
            debug!(mode = %requested, "mode unchanged");
            return Ok(ModeOutcome::Applied(requested));
        }

        match requested {
            CaptureMode::Disabled => {
                self.stop_all();
                self.request_reset();
                self.enter(CaptureMode::Disabled);
                Ok(ModeOutcome::Applied(CaptureMode::Disabled))
            }
            CaptureMode::FocusedFieldOnly => {
                self.global.stop();
                self.background_enabled = false;
                self.request_reset();
                if !self.focused.is_active() {
                    if let Err(e) = self.focused.start(self.sink.clone()) {
                        self.enter(CaptureMode::Disabled);
                        return Err(ModeError::FocusedCapture(e));
                    }
                }
                self.focused_suspended = false;
                self.enter(CaptureMode::FocusedFieldOnly);
                Ok(ModeOutcome::Applied(CaptureMode::FocusedFieldOnly))
            }
            CaptureMode::BackgroundService => self.enter_background().await,
        }
    }

    async fn enter_background(&mut self) -> Result<ModeOutcome, ModeError> {
        if !self.consent.background_mode_granted {
            info!("requesting consent for background scanning");
            let granted = self.prompt.request_consent(CONSENT_NOTICE).await;
            if !granted {
                info!("background scanning declined");
                self.stop_all();
                self.request_reset();
                self.enter(CaptureMode::Disabled);
                return Ok(ModeOutcome::ConsentDeclined);
            }
            self.consent.background_mode_granted = true;
        }

        self.focused.stop();
        self.focused_suspended = false;
        self.request_reset();

        if let Err(e) = self.global.start(self.sink.clone()) {
            warn!("background capture unavailable, scanning disabled: {e}");
            self.global.stop();
            self.enter(CaptureMode::Disabled);
            return Err(ModeError::HookInstallation(e));
        }

        self.background_enabled = true;
        self.enter(CaptureMode::BackgroundService);
        Ok(ModeOutcome::Applied(CaptureMode::BackgroundService))
    }

    /// Reacts to a host window lifecycle event.
    ///
    /// Minimising or deactivating the window discards any partial burst and
    /// suspends focused-field capture; restoring or activating resumes it.
    /// Background capture is unaffected by window state.
    ///
    /// # Errors
    ///
    /// Same as [`set_mode`](Self::set_mode) for `UserToggle`.
    pub async fn on_lifecycle(
        &mut self,
        signal: LifecycleSignal,
    ) -> Result<ModeOutcome, ModeError> {
        debug!(?signal, mode = %self.mode, "lifecycle signal");
        match signal {
            LifecycleSignal::Minimized | LifecycleSignal::Deactivated => {
                self.request_reset();
                if self.mode == CaptureMode::FocusedFieldOnly && self.focused.is_active() {
                    self.focused.stop();
                    self.focused_suspended = true;
                }
                Ok(ModeOutcome::Applied(self.mode))
            }
            LifecycleSignal::Restored | LifecycleSignal::Activated => {
                if self.mode == CaptureMode::FocusedFieldOnly && self.focused_suspended {
                    if let Err(e) = self.focused.start(self.sink.clone()) {
                        warn!("focused-field capture could not resume, scanning disabled: {e}");
                        self.stop_all();
                        self.enter(CaptureMode::Disabled);
                        return Err(ModeError::FocusedCapture(e));
                    }
                    self.focused_suspended = false;
                }
                Ok(ModeOutcome::Applied(self.mode))
            }
            LifecycleSignal::UserToggle(true) => self.set_mode(CaptureMode::BackgroundService).await,
            LifecycleSignal::UserToggle(false) => {
                self.set_mode(CaptureMode::FocusedFieldOnly).await
            }
        }
    }

    /// Stops every source.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.mode != CaptureMode::Disabled || self.focused.is_active() || self.global.is_active()
        {
            info!(mode = %self.mode, "scanner mode manager shutting down");
        }
        self.stop_all();
        self.enter(CaptureMode::Disabled);
    }

    fn stop_all(&mut self) {
        self.global.stop();
        self.focused.stop();
        self.focused_suspended = false;
        self.background_enabled = false;
    }

    fn enter(&mut self, mode: CaptureMode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "capture mode changed");
        }
        if mode != CaptureMode::BackgroundService {
            self.background_enabled = false;
        }
        self.mode = mode;
    }

    /// Asks the dispatcher to drop any partial burst.
    fn request_reset(&self) {
        match self.sink.try_send(CaptureSignal::Reset) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("key queue full; relying on origin change to reset the classifier")
            }
            Err(TrySendError::Disconnected(_)) => debug!("key queue closed"),
        }
    }
}

impl Drop for ScannerModeManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::{key_channel, CaptureKind, MockCaptureSource};
    use std::sync::mpsc::Receiver;

    struct Fixture {
        manager: ScannerModeManager,
        focused: MockCaptureSource,
        global: MockCaptureSource,
        rx: Receiver<CaptureSignal>,
    }

    fn fixture(prompt: MockConsentPrompt, global: MockCaptureSource) -> Fixture {
        let (tx, rx) = key_channel();
        let focused = MockCaptureSource::new(CaptureKind::FocusedField);
        let manager = ScannerModeManager::new(
            Box::new(focused.clone()),
            Box::new(global.clone()),
            Arc::new(prompt),
            tx,
        );
        Fixture {
            manager,
            focused,
            global,
            rx,
        }
    }

    fn prompt_answering(answer: bool, times: usize) -> MockConsentPrompt {
        let mut prompt = MockConsentPrompt::new();
        prompt
            .expect_request_consent()
            .times(times)
            .returning(move |_| answer);
        prompt
    }

    fn idle_global() -> MockCaptureSource {
        MockCaptureSource::new(CaptureKind::Background)
    }

    fn drain_resets(rx: &Receiver<CaptureSignal>) -> usize {
        rx.try_iter()
            .filter(|s| matches!(s, CaptureSignal::Reset))
            .count()
    }

    // ── Mode parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_capture_mode_parses_config_and_cli_spellings() {
        assert_eq!("background".parse::<CaptureMode>().unwrap(), CaptureMode::BackgroundService);
        assert_eq!(
            "focused-field-only".parse::<CaptureMode>().unwrap(),
            CaptureMode::FocusedFieldOnly
        );
        assert_eq!("Disabled".parse::<CaptureMode>().unwrap(), CaptureMode::Disabled);
        assert!("everywhere".parse::<CaptureMode>().is_err());
    }

    #[test]
    fn test_capture_mode_display_round_trips_through_from_str() {
        for mode in [
            CaptureMode::Disabled,
            CaptureMode::FocusedFieldOnly,
            CaptureMode::BackgroundService,
        ] {
            assert_eq!(mode.to_string().parse::<CaptureMode>().unwrap(), mode);
        }
    }

    // ── Focused / disabled ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_focused_mode_starts_only_the_focused_source() {
        // Arrange
        let mut f = fixture(prompt_answering(true, 0), idle_global());

        // Act
        let outcome = f.manager.set_mode(CaptureMode::FocusedFieldOnly).await;

        // Assert
        assert_eq!(outcome.unwrap(), ModeOutcome::Applied(CaptureMode::FocusedFieldOnly));
        assert!(f.focused.is_active());
        assert!(!f.global.is_active());
        assert_eq!(drain_resets(&f.rx), 1);
    }

    #[tokio::test]
    async fn test_disabled_stops_both_sources() {
        let mut f = fixture(prompt_answering(true, 1), idle_global());
        f.manager.set_mode(CaptureMode::BackgroundService).await.unwrap();

        f.manager.set_mode(CaptureMode::Disabled).await.unwrap();

        assert_eq!(f.manager.mode(), CaptureMode::Disabled);
        assert!(!f.focused.is_active());
        assert!(!f.global.is_active());
        assert!(!f.manager.background_mode_enabled());
    }

    #[tokio::test]
    async fn test_requesting_current_mode_is_a_no_op() {
        let mut f = fixture(prompt_answering(true, 0), idle_global());
        f.manager.set_mode(CaptureMode::FocusedFieldOnly).await.unwrap();
        drain_resets(&f.rx);

        f.manager.set_mode(CaptureMode::FocusedFieldOnly).await.unwrap();

        assert_eq!(f.focused.start_calls(), 1);
        assert_eq!(drain_resets(&f.rx), 0);
    }

    // ── Consent gate ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_background_prompts_once_with_the_notice() {
        // Arrange
        let mut prompt = MockConsentPrompt::new();
        prompt
            .expect_request_consent()
            .withf(|notice| notice.contains("passwords"))
            .times(1)
            .returning(|_| true);
        let mut f = fixture(prompt, idle_global());

        // Act
        let first = f.manager.set_mode(CaptureMode::BackgroundService).await;
        f.manager.set_mode(CaptureMode::FocusedFieldOnly).await.unwrap();
        let second = f.manager.set_mode(CaptureMode::BackgroundService).await;

        // Assert – the mock panics on drop if it was asked twice
        assert_eq!(first.unwrap(), ModeOutcome::Applied(CaptureMode::BackgroundService));
        assert_eq!(second.unwrap(), ModeOutcome::Applied(CaptureMode::BackgroundService));
        assert!(f.manager.consent_state().background_mode_granted);
    }

    #[tokio::test]
    async fn test_declined_consent_leaves_manager_disabled() {
        // Arrange
        let mut f = fixture(prompt_answering(false, 1), idle_global());
        f.manager.set_mode(CaptureMode::FocusedFieldOnly).await.unwrap();

        // Act
        let outcome = f.manager.set_mode(CaptureMode::BackgroundService).await;

        // Assert
        assert_eq!(outcome.unwrap(), ModeOutcome::ConsentDeclined);
        assert_eq!(f.manager.mode(), CaptureMode::Disabled);
        assert!(!f.manager.background_mode_enabled());
        assert!(!f.manager.consent_state().background_mode_granted);
        assert_eq!(f.global.start_calls(), 0);
        assert!(!f.focused.is_active());
    }

    #[tokio::test]
    async fn test_seeded_consent_skips_the_prompt() {
        let f = fixture(prompt_answering(true, 0), idle_global());
        let mut manager = f.manager.with_consent(ConsentState {
            background_mode_granted: true,
        });

        manager.set_mode(CaptureMode::BackgroundService).await.unwrap();

        assert!(f.global.is_active());
    }

    // ── Hook install failure ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_hook_failure_falls_back_to_disabled_and_reports_once() {
        // Arrange
        let global = MockCaptureSource::failing(CaptureKind::Background);
        let mut f = fixture(prompt_answering(true, 1), global);

        // Act
        let result = f.manager.set_mode(CaptureMode::BackgroundService).await;

        // Assert
        assert!(matches!(result, Err(ModeError::HookInstallation(_))));
        assert_eq!(f.manager.mode(), CaptureMode::Disabled);
        assert!(!f.manager.background_mode_enabled());
        assert_eq!(f.global.start_calls(), 1);
        assert!(!f.global.is_active());
        // Consent stays granted; the failure was the OS, not the user.
        assert!(f.manager.consent_state().background_mode_granted);
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_minimize_suspends_and_restore_resumes_focused_capture() {
        // Arrange
        let mut f = fixture(prompt_answering(true, 0), idle_global());
        f.manager.set_mode(CaptureMode::FocusedFieldOnly).await.unwrap();
        drain_resets(&f.rx);

        // Act / Assert
        f.manager.on_lifecycle(LifecycleSignal::Minimized).await.unwrap();
        assert!(!f.focused.is_active());
        assert_eq!(f.manager.mode(), CaptureMode::FocusedFieldOnly);
        assert_eq!(drain_resets(&f.rx), 1);

        f.manager.on_lifecycle(LifecycleSignal::Restored).await.unwrap();
        assert!(f.focused.is_active());
        assert_eq!(f.focused.start_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_resume_falls_back_to_disabled() {
        // Arrange
        let mut f = fixture(prompt_answering(true, 0), idle_global());
        f.manager.set_mode(CaptureMode::FocusedFieldOnly).await.unwrap();
        f.manager.on_lifecycle(LifecycleSignal::Minimized).await.unwrap();
        f.focused.set_fail_start(true);

        // Act
        let result = f.manager.on_lifecycle(LifecycleSignal::Restored).await;

        // Assert
        assert!(matches!(result, Err(ModeError::FocusedCapture(_))));
        assert_eq!(f.manager.mode(), CaptureMode::Disabled);
        assert!(!f.focused.is_active());
        assert!(!f.global.is_active());

        // A later request starts cleanly once the source recovers.
        f.focused.set_fail_start(false);
        let outcome = f.manager.set_mode(CaptureMode::FocusedFieldOnly).await;
        assert_eq!(outcome.unwrap(), ModeOutcome::Applied(CaptureMode::FocusedFieldOnly));
        assert!(f.focused.is_active());
    }

    #[tokio::test]
    async fn test_deactivate_keeps_background_capture_running() {
        let mut f = fixture(prompt_answering(true, 1), idle_global());
        f.manager.set_mode(CaptureMode::BackgroundService).await.unwrap();

        f.manager.on_lifecycle(LifecycleSignal::Deactivated).await.unwrap();
        f.manager.on_lifecycle(LifecycleSignal::Activated).await.unwrap();

        assert!(f.global.is_active());
        assert_eq!(f.global.start_calls(), 1);
        assert!(!f.focused.is_active());
    }

    #[tokio::test]
    async fn test_user_toggle_drives_background_mode() {
        let mut f = fixture(prompt_answering(true, 1), idle_global());

        f.manager.on_lifecycle(LifecycleSignal::UserToggle(true)).await.unwrap();
        assert!(f.manager.background_mode_enabled());

        f.manager.on_lifecycle(LifecycleSignal::UserToggle(false)).await.unwrap();
        assert_eq!(f.manager.mode(), CaptureMode::FocusedFieldOnly);
        assert!(!f.global.is_active());
        assert!(f.focused.is_active());
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_drop_releases_the_hook() {
        let f = fixture(prompt_answering(true, 1), idle_global());
        let global = f.global.clone();
        let mut manager = f.manager;
        manager.set_mode(CaptureMode::BackgroundService).await.unwrap();

        drop(manager);

        assert!(!global.is_active());
    }

    #[test]
    fn test_shutdown_twice_is_harmless() {
        let mut f = fixture(prompt_answering(true, 0), idle_global());
        f.manager.shutdown();
        f.manager.shutdown();
        assert_eq!(f.manager.mode(), CaptureMode::Disabled);
    }
}
