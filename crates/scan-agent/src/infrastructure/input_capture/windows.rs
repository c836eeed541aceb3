//! Windows system-wide capture through a low-level keyboard hook.
//!
//! This module installs a `WH_KEYBOARD_LL` hook on a dedicated thread that
//! runs its own Win32 message loop.  The queue sender lives in that thread's
//! thread-local storage, so the callback reaches it without any global, and
//! independent capture instances never share state.
//!
//! # Hook lifetime
//!
//! ```text
//! start()  ── spawn "scan-hook-loop" ──► SetWindowsHookExW
//!    ▲                                        │
//!    └──────── ready: Ok(thread id) / Err ◄───┘
//!
//! stop()   ── PostThreadMessageW(WM_QUIT) ──► loop exits, UnhookWindowsHookEx
//!          ── join
//! ```
//!
//! The [`HookHandle`] is an owned `Option` field, taken by `stop()` or by
//! `Drop`.  It is put back if the hook thread cannot be signalled, so
//! `is_active()` never reports false while the hook is still installed.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::cell::RefCell;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use scan_core::{KeyEvent, KeyMapper};
use tracing::{debug, info, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION, KBDLLHOOKSTRUCT, MSG,
    PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_QUIT, WM_SYSKEYDOWN,
};

use super::{CaptureError, CaptureKind, CaptureSignal, InputCaptureSource, KeySender};

thread_local! {
    /// Queue sender for the hook callback.  Only set on the hook thread.
    static HOOK_SINK: RefCell<Option<KeySender>> = const { RefCell::new(None) };
}

/// An installed hook: the thread that owns it and how to reach that thread.
struct HookHandle {
    thread_id: u32,
    thread: JoinHandle<()>,
}

impl HookHandle {
    /// Ends the hook thread's message loop and waits for it to unhook.
    ///
    /// Hands the handle back if the thread could not be signalled; the hook
    /// is then still installed and the caller must keep owning it.
    fn release(self) -> Result<(), HookHandle> {
        // SAFETY: the id belongs to our hook thread, whose message queue was
        // created before it reported ready.
        let posted = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
        if let Err(e) = posted {
            warn!("could not signal hook thread to exit: {e}");
            return Err(self);
        }
        if self.thread.join().is_err() {
            warn!("hook thread panicked during shutdown");
        }
        Ok(())
    }
}

/// System-wide keyboard capture for Windows.
pub struct WindowsGlobalCapture {
    hook: Option<HookHandle>,
}

impl WindowsGlobalCapture {
    /// Creates a new (unstarted) capture instance.
    pub fn new() -> Self {
        Self { hook: None }
    }
}

impl Default for WindowsGlobalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCaptureSource for WindowsGlobalCapture {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Background
    }

    fn start(&mut self, sink: KeySender) -> Result<(), CaptureError> {
        if self.hook.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let thread = thread::Builder::new()
            .name("scan-hook-loop".to_string())
            .spawn(move || run_hook_thread(sink, ready_tx))
            .map_err(CaptureError::ThreadSpawn)?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                self.hook = Some(HookHandle { thread_id, thread });
                info!("system-wide keyboard hook installed");
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = thread.join();
                Err(CaptureError::HookInstallFailed(reason))
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::HookInstallFailed(
                    "hook thread exited before reporting".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(hook) = self.hook.take() {
            match hook.release() {
                Ok(()) => info!("system-wide keyboard hook removed"),
                // Still installed; a later stop() or Drop retries.
                Err(hook) => self.hook = Some(hook),
            }
        }
    }

    fn is_active(&self) -> bool {
        self.hook.is_some()
    }
}

impl Drop for WindowsGlobalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Entry point for the dedicated hook thread.
fn run_hook_thread(sink: KeySender, ready: mpsc::Sender<Result<u32, String>>) {
    HOOK_SINK.with(|cell| *cell.borrow_mut() = Some(sink));

    let mut msg = MSG::default();
    // SAFETY: peeking forces creation of this thread's message queue so that
    // PostThreadMessageW from `stop()` cannot race ahead of it.
    unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
    }

    // SAFETY: low-level hooks need no module handle; thread id 0 observes
    // every thread on the desktop.  The callback runs on this thread.
    let hook = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) }
    {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    // SAFETY: plain FFI query with no arguments.
    let thread_id = unsafe { GetCurrentThreadId() };
    let reported = ready.send(Ok(thread_id)).is_ok();

    // SAFETY: standard Win32 GetMessage/DispatchMessage loop.  GetMessageW
    // returns 0 on WM_QUIT and -1 on error; both end the loop.
    unsafe {
        while reported && GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        if let Err(e) = UnhookWindowsHookEx(hook) {
            warn!("UnhookWindowsHookEx failed: {e}");
        }
    }

    HOOK_SINK.with(|cell| cell.borrow_mut().take());
    debug!("hook thread exiting");
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows from the hook thread.  It must return quickly or the OS
/// silently removes the hook, so the only work done here is a table lookup
/// and a non-blocking send.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        let message = w_param.0 as u32;
        if message == WM_KEYDOWN || message == WM_SYSKEYDOWN {
            // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
            let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
            forward_key(kbs.vkCode);
        }
    }

    // SAFETY: this hook only observes; every event continues down the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Queues one key.  Any failure drops the key.
fn forward_key(vk_code: u32) {
    let signal = CaptureSignal::Key {
        event: KeyEvent::now(KeyMapper::windows_vk_to_key(vk_code)),
        source: CaptureKind::Background,
    };
    let _ = HOOK_SINK.try_with(|cell| {
        if let Ok(slot) = cell.try_borrow() {
            if let Some(sink) = slot.as_ref() {
                let _ = sink.try_send(signal);
            }
        }
    });
}
