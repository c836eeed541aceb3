//! Key code translation tables for the platform capture hooks.
//!
//! Each global capture implementation receives a platform-specific key code
//! and must turn it into a [`ScanKey`] inside the native callback, so every
//! lookup here is a constant-time table or `match`.

pub mod macos_cg;
pub mod windows_vk;

use crate::domain::key::ScanKey;

/// Unified key mapper over the platform tables.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a Windows Virtual Key code to a [`ScanKey`].
    pub fn windows_vk_to_key(vk: u32) -> ScanKey {
        windows_vk::vk_to_key(vk)
    }

    /// Translates a macOS `CGKeyCode` to a [`ScanKey`].
    pub fn macos_cgkeycode_to_key(code: u16) -> ScanKey {
        macos_cg::cgkeycode_to_key(code)
    }
}
