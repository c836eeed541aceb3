//! macOS `CGKeyCode` to [`ScanKey`] translation.
//!
//! Reference: `<HIToolbox/Events.h>` (`kVK_ANSI_*` constants).
//!
//! macOS key codes describe the *physical* key position on an ANSI keyboard,
//! so unlike Windows VK codes they are not laid out in alphabetical order.

use crate::domain::key::ScanKey;

/// Translates a macOS `CGKeyCode` (from `kCGKeyboardEventKeycode`) to a
/// [`ScanKey`].  Unmapped codes are [`ScanKey::Other`].
pub fn cgkeycode_to_key(code: u16) -> ScanKey {
    match code {
        // ── Digit row ────────────────────────────────────────────────────────
        0x1D => ScanKey::Digit(0), // kVK_ANSI_0
        0x12 => ScanKey::Digit(1), // kVK_ANSI_1
        0x13 => ScanKey::Digit(2), // kVK_ANSI_2
        0x14 => ScanKey::Digit(3), // kVK_ANSI_3
        0x15 => ScanKey::Digit(4), // kVK_ANSI_4
        0x17 => ScanKey::Digit(5), // kVK_ANSI_5
        0x16 => ScanKey::Digit(6), // kVK_ANSI_6
        0x1A => ScanKey::Digit(7), // kVK_ANSI_7
        0x1C => ScanKey::Digit(8), // kVK_ANSI_8
        0x19 => ScanKey::Digit(9), // kVK_ANSI_9

        // ── Keypad digits ────────────────────────────────────────────────────
        0x52 => ScanKey::Digit(0), // kVK_ANSI_Keypad0
        0x53 => ScanKey::Digit(1),
        0x54 => ScanKey::Digit(2),
        0x55 => ScanKey::Digit(3),
        0x56 => ScanKey::Digit(4),
        0x57 => ScanKey::Digit(5),
        0x58 => ScanKey::Digit(6),
        0x59 => ScanKey::Digit(7),
        0x5B => ScanKey::Digit(8),
        0x5C => ScanKey::Digit(9), // kVK_ANSI_Keypad9

        // ── Letters ──────────────────────────────────────────────────────────
        0x00 => ScanKey::Letter('A'),
        0x0B => ScanKey::Letter('B'),
        0x08 => ScanKey::Letter('C'),
        0x02 => ScanKey::Letter('D'),
        0x0E => ScanKey::Letter('E'),
        0x03 => ScanKey::Letter('F'),
        0x05 => ScanKey::Letter('G'),
        0x04 => ScanKey::Letter('H'),
        0x22 => ScanKey::Letter('I'),
        0x26 => ScanKey::Letter('J'),
        0x28 => ScanKey::Letter('K'),
        0x25 => ScanKey::Letter('L'),
        0x2E => ScanKey::Letter('M'),
        0x2D => ScanKey::Letter('N'),
        0x1F => ScanKey::Letter('O'),
        0x23 => ScanKey::Letter('P'),
        0x0C => ScanKey::Letter('Q'),
        0x0F => ScanKey::Letter('R'),
        0x01 => ScanKey::Letter('S'),
        0x11 => ScanKey::Letter('T'),
        0x20 => ScanKey::Letter('U'),
        0x09 => ScanKey::Letter('V'),
        0x0D => ScanKey::Letter('W'),
        0x07 => ScanKey::Letter('X'),
        0x10 => ScanKey::Letter('Y'),
        0x06 => ScanKey::Letter('Z'),

        0x24 => ScanKey::Enter, // kVK_Return
        0x4C => ScanKey::Enter, // kVK_ANSI_KeypadEnter

        _ => ScanKey::Other,
    }
}
