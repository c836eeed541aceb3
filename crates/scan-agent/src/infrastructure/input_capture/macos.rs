//! macOS system-wide capture through a CoreGraphics event tap.
//!
//! A listen-only `CGEventTap` for key-down events runs on a dedicated
//! run-loop thread.  The tap callback is a closure that owns a clone of the
//! queue sender, so no global or thread-local state is involved.
//!
//! Creating the tap fails when the process lacks the Input Monitoring
//! permission.  That failure is reported synchronously from `start()` as
//! [`CaptureError::PermissionDenied`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
    CGEventTapProxy, CGEventType, CallbackResult, EventField,
};
use scan_core::{KeyEvent, KeyMapper};
use tracing::{debug, info, warn};

use super::{CaptureError, CaptureKind, CaptureSignal, InputCaptureSource, KeySender};

/// How often the run-loop thread checks whether it should exit.
const RUN_LOOP_POLL: Duration = Duration::from_millis(100);

/// An installed event tap: the thread running it and its stop flag.
struct HookHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl HookHandle {
    fn release(self) {
        self.running.store(false, Ordering::SeqCst);
        if self.thread.join().is_err() {
            warn!("event tap thread panicked during shutdown");
        }
    }
}

/// System-wide keyboard capture for macOS.
#[derive(Default)]
pub struct MacosGlobalCapture {
    hook: Option<HookHandle>,
}

impl MacosGlobalCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputCaptureSource for MacosGlobalCapture {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Background
    }

    fn start(&mut self, sink: KeySender) -> Result<(), CaptureError> {
        if self.hook.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();
        let thread_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("scan-event-tap".to_string())
            .spawn(move || run_event_tap(sink, thread_running, ready_tx))
            .map_err(CaptureError::ThreadSpawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.hook = Some(HookHandle { running, thread });
                info!("system-wide event tap installed");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::HookInstallFailed(
                    "event tap thread exited before reporting".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook.release();
            info!("system-wide event tap removed");
        }
    }

    fn is_active(&self) -> bool {
        self.hook.is_some()
    }
}

impl Drop for MacosGlobalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Creates the tap, reports the outcome, then runs the loop until stopped.
fn run_event_tap(
    sink: KeySender,
    running: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), CaptureError>>,
) {
    let callback = move |_proxy: CGEventTapProxy, event_type: CGEventType, event: &CGEvent| {
        if matches!(event_type, CGEventType::KeyDown) {
            let code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
            let key = u16::try_from(code)
                .map(KeyMapper::macos_cgkeycode_to_key)
                .unwrap_or(scan_core::ScanKey::Other);
            let _ = sink.try_send(CaptureSignal::Key {
                event: KeyEvent::now(key),
                source: CaptureKind::Background,
            });
        }
        // Listen-only: the event always continues unchanged.
        CallbackResult::Keep
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            let _ = ready.send(Err(CaptureError::PermissionDenied));
            return;
        }
    };

    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(CaptureError::HookInstallFailed(
                "could not create run loop source".to_string(),
            )));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    // SAFETY: kCFRunLoopCommonModes is an immutable CoreFoundation constant.
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();

    if ready.send(Ok(())).is_err() {
        return;
    }

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            // SAFETY: see above.
            unsafe { kCFRunLoopCommonModes },
            RUN_LOOP_POLL,
            false,
        );
    }

    // The tap is disabled and released when dropped.
    debug!("event tap thread exiting");
}
