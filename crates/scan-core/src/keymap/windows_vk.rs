//! Windows Virtual Key (VK) code to [`ScanKey`] translation table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! # What is a Windows Virtual Key (VK) code? (for beginners)
//!
//! Windows assigns each keyboard key a number called a "Virtual Key code".
//! They are "virtual" because they represent *logical* keys rather than
//! physical scan codes: the letter A is always `VK_A = 0x41`.  A low-level
//! keyboard hook receives the VK code in `KBDLLHOOKSTRUCT::vkCode`.
//!
//! # How this table works
//!
//! `VK_TO_KEY_TABLE` is a compile-time array of 256 [`ScanKey`] values indexed
//! by VK code.  Indexing is an O(1) lookup, which matters because the hook
//! callback runs this for every key pressed anywhere on the machine.

use crate::domain::key::ScanKey;

pub const VK_RETURN: u32 = 0x0D;

/// Translates a Windows Virtual Key code to a [`ScanKey`].
///
/// VK codes above `0xFF` (never produced by a keyboard hook) map to
/// [`ScanKey::Other`].  This function never panics.
pub fn vk_to_key(vk: u32) -> ScanKey {
    match usize::try_from(vk) {
        Ok(idx) if idx < VK_TO_KEY_TABLE.len() => VK_TO_KEY_TABLE[idx],
        _ => ScanKey::Other,
    }
}

/// Complete VK → ScanKey table indexed by VK code (0x00–0xFF).
const VK_TO_KEY_TABLE: [ScanKey; 256] = {
    let mut t = [ScanKey::Other; 256];

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ───────────────────────────────────
    let mut d = 0u8;
    while d < 10 {
        t[0x30 + d as usize] = ScanKey::Digit(d);
        // ── Numpad (VK_NUMPAD0=0x60 … VK_NUMPAD9=0x69) ──────────────────────
        t[0x60 + d as usize] = ScanKey::Digit(d);
        d += 1;
    }

    // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ────────────────────────────────
    let mut l = 0u8;
    while l < 26 {
        t[0x41 + l as usize] = ScanKey::Letter((b'A' + l) as char);
        l += 1;
    }

    // VK_RETURN covers both the main and the numpad Enter key.
    t[VK_RETURN as usize] = ScanKey::Enter;

    t
};
